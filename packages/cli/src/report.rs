//! Plain-text rendering of dashboard state.

use wardwatch_dashboard::{AnalysisState, Dashboard};
use wardwatch_focus::FocusAction;
use wardwatch_station_models::{AqiSeverity, Station};

pub fn print_overview(dashboard: &Dashboard) {
    let stations = dashboard.stations();
    let average = dashboard.average_aqi();

    println!("{}", dashboard.overview_label());
    println!(
        "  {} stations, average AQI {average} ({})",
        stations.len(),
        AqiSeverity::from_aqi(average)
    );
    println!();

    println!("Top critical zones");
    for (rank, station) in dashboard.top_critical().iter().enumerate() {
        println!(
            "  {:>2}. {:<40} AQI {:>3}  {}",
            rank + 1,
            station.name,
            station.aqi,
            station.severity()
        );
    }
    println!();
}

pub fn print_search_results(results: &[Station]) {
    if results.is_empty() {
        println!("No stations found");
        return;
    }

    println!("Search results");
    for (index, station) in results.iter().enumerate() {
        println!(
            "  {:>2}. {:<40} AQI {:>3}  ({:.4}, {:.4})",
            index + 1,
            station.name,
            station.aqi,
            station.location.lat,
            station.location.lng
        );
    }
    println!();
}

pub fn print_station(station: &Station) {
    let p = &station.pollutants;

    println!("Selected: {} [{}]", station.name, station.id);
    println!(
        "  AQI {} ({}, {})",
        station.aqi,
        station.severity(),
        station.severity().color_hex()
    );
    println!(
        "  PM2.5 {}  PM10 {}  NO2 {}  SO2 {}  CO {}  O3 {}",
        p.pm25, p.pm10, p.no2, p.so2, p.co, p.o3
    );
    println!(
        "  Sources: {} / {}",
        station.primary_source, station.secondary_source
    );
    if station.population > 0 {
        println!("  Population: {}", station.population);
    }
    if !station.trend.is_empty() {
        let trend: Vec<String> = station.trend.iter().map(u32::to_string).collect();
        println!("  7-day trend: {}", trend.join(" → "));
    }
    println!();
}

pub fn print_camera(dashboard: &Dashboard, action: &FocusAction) {
    match action {
        FocusAction::None if dashboard.stations().is_empty() => {
            let view = dashboard.default_view();
            println!(
                "Camera: default view ({:.4}, {:.4}) at zoom {}",
                view.center.lat, view.center.lng, view.zoom
            );
        }
        FocusAction::None => println!("Camera: unchanged"),
        FocusAction::FlyTo { target, zoom } => {
            println!(
                "Camera: fly to ({:.4}, {:.4}) at zoom {zoom}",
                target.lat, target.lng
            );
        }
        FocusAction::FitAll { bounds, padding_px } => println!(
            "Camera: fit ({:.4}, {:.4}) - ({:.4}, {:.4}) with {padding_px}px padding",
            bounds.south_west.lat, bounds.south_west.lng, bounds.north_east.lat, bounds.north_east.lng
        ),
    }
}

pub fn print_analysis(state: &AnalysisState) {
    println!();
    match state {
        AnalysisState::Idle => println!("Analysis: not requested"),
        AnalysisState::Loading { station_id } => println!("Analysis: pending for {station_id}"),
        AnalysisState::Unavailable { reason, .. } => println!("Analysis unavailable: {reason}"),
        AnalysisState::Ready { result, .. } => {
            if let Some(trend) = &result.trend_analysis {
                println!("Historical context");
                println!("  {trend}");
                println!();
            }

            println!("Recommendations");
            if result.recommendations.is_empty() {
                println!("  No recommendations available.");
            }
            for rec in &result.recommendations {
                println!("  [{}] {}", rec.kind.as_ref().to_uppercase(), rec.title);
                println!("      {}", rec.description);
            }

            if let Some(breakdown) = &result.source_breakdown {
                println!();
                println!("Source attribution");
                for share in breakdown {
                    println!(
                        "  {:<32} {:>5.1}%  ({} confidence)",
                        share.source, share.percentage, share.confidence
                    );
                }
            }

            if let Some(news) = result.news.as_ref().filter(|n| !n.is_empty()) {
                println!();
                println!("Latest news");
                for item in news {
                    let source = item.source.as_deref().unwrap_or("unknown source");
                    println!("  {} ({source}, {})", item.title, item.time_ago);
                    println!("      {}", item.summary);
                }
            }

            if !result.grounding_urls.is_empty() {
                println!();
                println!("Sources");
                for link in &result.grounding_urls {
                    println!("  {} <{}>", link.title, link.uri);
                }
            }
        }
    }
}
