//! Chart commands over the stored history.

use std::path::Path;

use wifi_survey::{quality_series, speed_series, start_anchored, Chart, SurveyResult, SurveyStore};

/// Plot quality over scans for every network whose ESSID matches `essid_filter`.
pub fn plot_quality(store: &SurveyStore, essid_filter: &str, output: &Path) -> SurveyResult<Chart> {
    let filter = start_anchored(essid_filter)?;
    let scans = store.scans()?;
    let observations = store.all_observations()?;
    let data = quality_series(&scans, &observations, &filter);
    tracing::info!(
        "Plotting {} networks over {} scans to {}",
        data.series.len(),
        scans.len(),
        output.display()
    );

    let chart = Chart::new("Quality vs Locality", "Location/Time", "Quality", data);
    chart.write_svg(output)?;
    Ok(chart)
}

/// Plot download speed for samples whose exit IP matches `ip_filter`.
pub fn plot_speed(
    store: &SurveyStore,
    ip_filter: &str,
    header: &str,
    output: &Path,
) -> SurveyResult<Chart> {
    let filter = start_anchored(ip_filter)?;
    let samples = store.speed_samples()?;
    let data = speed_series(&samples, &filter, ip_filter);
    tracing::info!(
        "Plotting {} of {} speed samples to {}",
        data.x_ticks.len(),
        samples.len(),
        output.display()
    );

    let chart = Chart::new(
        &format!("Real-World-Tor-Speed: {header}"),
        "IP address",
        "Speed [Byte/Second]",
        data,
    );
    chart.write_svg(output)?;
    Ok(chart)
}
