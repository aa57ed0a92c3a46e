use plotters::prelude::*;

use crate::price::PricePoint;
use crate::window::Window;
use crate::EspotError;

const BAR_COLOR: RGBColor = RGBColor(96, 125, 139);
const WINDOW_COLOR: RGBColor = RGBColor(46, 160, 67);

/// Render the prices as an SVG bar chart, one bar per hour in series order.
///
/// Bars inside `highlight` are drawn in a separate color. The x axis is
/// labelled with the starting hour of each bar, the y axis with the price.
pub fn render_price_chart(
    points: &[PricePoint],
    highlight: Option<&Window>,
    width: u32,
    height: u32,
) -> Result<String, EspotError> {
    if points.is_empty() {
        return Err(EspotError::Chart("no prices to draw".to_owned()));
    }

    let (low, high) = points
        .iter()
        .fold((0.0_f64, 0.0_f64), |(low, high), p| {
            (low.min(p.price_sek), high.max(p.price_sek))
        });
    let high = if high - low < f64::EPSILON { low + 1.0 } else { high };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| EspotError::Chart(format!("failed to fill canvas: {e}")))?;

        let mut chart = ChartBuilder::on(&root)
            .margin(8)
            .x_label_area_size(20)
            .y_label_area_size(40)
            .build_cartesian_2d(0.0..points.len() as f64, low..high)
            .map_err(|e| EspotError::Chart(format!("failed to build chart: {e}")))?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(points.len().min(24))
            .x_label_formatter(&|x: &f64| hour_label(points, *x))
            .y_label_formatter(&|y: &f64| format!("{y:.2}"))
            .draw()
            .map_err(|e| EspotError::Chart(format!("failed to draw axes: {e}")))?;

        chart
            .draw_series(points.iter().enumerate().map(|(i, p)| {
                let color = match highlight {
                    Some(window) if window.contains(p) => WINDOW_COLOR,
                    _ => BAR_COLOR,
                };
                let x = i as f64;
                Rectangle::new([(x + 0.1, 0.0), (x + 0.9, p.price_sek)], color.filled())
            }))
            .map_err(|e| EspotError::Chart(format!("failed to draw bars: {e}")))?;

        root.present()
            .map_err(|e| EspotError::Chart(format!("failed to finish chart: {e}")))?;
    }

    Ok(svg)
}

/// Label for an x axis position: the two-digit hour of the bar starting there.
fn hour_label(points: &[PricePoint], x: f64) -> String {
    if x < 0.0 {
        return String::new();
    }
    points
        .get(x.floor() as usize)
        .map(|p| p.starts_at().format("%H").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::PriceSeries;
    use crate::window::select_best_window;
    use chrono::NaiveDate;

    fn points() -> Vec<PricePoint> {
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        [0.8, 0.4, 0.3, -0.1, 0.9]
            .iter()
            .enumerate()
            .map(|(h, &p)| PricePoint::new(date, h as u8, p))
            .collect()
    }

    #[test]
    fn test_render_chart_highlights_window() {
        let series = PriceSeries::new(points()).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let selection = select_best_window(&series, 2, date, 23).unwrap();

        let svg = render_price_chart(series.points(), Some(&selection.best), 640, 240).unwrap();

        assert!(svg.contains("<svg"));
        // background plus one bar per hour
        assert!(svg.matches("<rect").count() >= 6);
        assert!(svg.to_lowercase().contains("#2ea043"));
        assert!(svg.contains("<text"));
    }

    #[test]
    fn test_hour_label() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let points = vec![
            PricePoint::new(date, 22, 0.5),
            PricePoint::new(date, 23, 0.4),
            PricePoint::new(date.succ_opt().unwrap(), 0, 0.3),
        ];

        assert_eq!(hour_label(&points, 0.0), "22");
        assert_eq!(hour_label(&points, 1.5), "23");
        assert_eq!(hour_label(&points, 2.0), "00");
        assert_eq!(hour_label(&points, 3.0), "");
        assert_eq!(hour_label(&points, -1.0), "");
    }

    #[test]
    fn test_render_chart_flat_prices() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let flat = vec![PricePoint::new(date, 0, 0.0), PricePoint::new(date, 1, 0.0)];

        assert!(render_price_chart(&flat, None, 320, 120).is_ok());
    }

    #[test]
    fn test_render_chart_empty() {
        assert!(matches!(
            render_price_chart(&[], None, 320, 120),
            Err(EspotError::Chart(_))
        ));
    }
}
