use bestiapop::{AcquisitionRequest, BestiaPop, Status};
use polars::prelude::*;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    configure_polars_display();
    let bestiapop = BestiaPop::new()?;

    let mut status = bestiapop.subscribe();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current: Status = *status.borrow_and_update();
            println!("status: {:?} {}", current, current);
        }
    });

    let request = AcquisitionRequest::builder()
        .latitude(-35.0)
        .longitude(149.0)
        .start_year(2010)
        .end_year(2011)
        .build();
    println!("request: {}", serde_json::to_string(&request)?);

    let series = bestiapop.generate().request(&request).call().await?;
    println!(
        "{} days from {:?}, tav {:.1} amp {:.1}",
        series.len(),
        series.file_name(),
        series.tav(),
        series.amp()
    );

    let monthly = series
        .frame_for_years(2011, 2011)?
        .group_by([col("date").dt().month()])
        .agg([col("rain").sum(), col("maxt").mean(), col("mint").mean()])
        .sort(["date"], Default::default())
        .collect()?;
    println!("{:#?}", monthly);

    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    // show 20 rows
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
