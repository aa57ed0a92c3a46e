use espot_planner::{query_prices, Zone};

#[tokio::main]
async fn main() {
    let today = chrono::Local::now().date_naive();
    let prices = query_prices(Zone::Se3, today)
        .await
        .expect("Querying prices failed.");

    println!("Prices for {today} in {}:", Zone::Se3);
    for point in prices {
        println!(
            "{:02}:00 - {:02}:00: {:.02} SEK",
            point.hour,
            (point.hour + 1) % 24,
            point.price_sek
        );
    }
}
