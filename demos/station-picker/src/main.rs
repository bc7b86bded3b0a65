//! Station picker demo.
//!
//! Searches stations by keyword and, given two or more departure points,
//! asks the server for the middle-point recommendation and selects the first
//! recommended station.
//!
//! ```text
//! MEEPLO_SERVER_BASE_URL=https://api.example.com \
//! MEEPLO_ACCESS_TOKEN=... MEEPLO_REFRESH_TOKEN=... \
//!     cargo run -p station-picker -- gangnam 37.50,127.03 37.56,126.97
//! ```

use meeplo_client::api::{self, keys};
use meeplo_client::model::{Coordinate, MiddlePointRequest, Station};
use meeplo_client::{ClientConfig, MeeploClient, Payload, ResourceView};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn parse_coordinate(raw: &str) -> Result<Coordinate, String> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got {raw:?}"))?;
    let lat = lat.trim().parse().map_err(|_| format!("bad latitude in {raw:?}"))?;
    let lng = lng.trim().parse().map_err(|_| format!("bad longitude in {raw:?}"))?;
    Ok(Coordinate { lat, lng })
}

fn print_stations(stations: &[Station]) {
    for station in stations {
        let times = if station.required_times.is_empty() {
            String::new()
        } else {
            format!("  ({} min)", station.required_times.iter().map(u32::to_string).collect::<Vec<_>>().join("/"))
        };
        println!("  - {} [{:.4}, {:.4}]{times}", station.name, station.lat, station.lng);
    }
}

async fn settle(view: &mut ResourceView) -> Result<Vec<Station>, Box<dyn std::error::Error>> {
    let resource = tokio::time::timeout(Duration::from_secs(30), view.settled()).await??;
    if let Some(error) = resource.error() {
        return Err(format!("{} failed: {error}", view.key()).into());
    }
    Ok(resource
        .data()
        .and_then(Payload::as_stations)
        .map(<[Station]>::to_vec)
        .unwrap_or_default())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "station_picker=info,meeplo_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let keyword = args.next().ok_or("usage: station-picker KEYWORD [LAT,LNG ...]")?;
    let departures = args.map(|raw| parse_coordinate(&raw)).collect::<Result<Vec<_>, _>>()?;

    let client = MeeploClient::connect(ClientConfig::from_env()?)?;
    if let (Ok(access), Ok(refresh)) = (
        std::env::var("MEEPLO_ACCESS_TOKEN"),
        std::env::var("MEEPLO_REFRESH_TOKEN"),
    ) {
        client.sign_in(&access, &refresh).await?;
    }

    println!("=== Station Picker ===\n");

    let mut search = client.view(keys::LOCATION).await?;
    search.dispatch(api::get_station_list(&keyword)).await?;
    let found = settle(&mut search).await?;
    println!("Stations matching {keyword:?}: {}", found.len());
    print_stations(&found);

    if departures.len() >= 2 {
        let mut recommendation = client.view(keys::RECOMMENDATION).await?;
        recommendation
            .dispatch(api::get_middle_point(&MiddlePointRequest {
                start_locations: departures,
            })?)
            .await?;
        let recommended = settle(&mut recommendation).await?;

        println!("\nRecommended meeting points: {}", recommended.len());
        print_stations(&recommended);
        if let Some(selected) = recommended.first() {
            println!("\nSelected: {}", selected.name);
        }
    }

    client.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinates() {
        assert_eq!(
            parse_coordinate("37.5, 127.0"),
            Ok(Coordinate { lat: 37.5, lng: 127.0 })
        );
        assert!(parse_coordinate("37.5").is_err());
        assert!(parse_coordinate("north,127").is_err());
    }
}
