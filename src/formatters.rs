use crate::advisor::RecommendationResult;
use crate::models::Location;
use crate::observation::{ObservationSeries, Variable};
use crate::recommender::TrackedVariable;

/// Formats a geocoding result into a human-readable string
pub fn format_location(location: &Location) -> String {
    format!(
        "Location: {}\nLatitude: {:.4}\nLongitude: {:.4}\n",
        location.name, location.latitude, location.longitude
    )
}

/// Formats a climate series as per-variable means plus the latest day
pub fn format_climate_summary(location: &Location, series: &ObservationSeries) -> String {
    let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
        return format!("No climate records available for {}.", location.name);
    };

    let mut output = format!(
        "Climate Summary (NASA POWER)\nLocation: {} ({:.4}, {:.4})\nPeriod: {} to {} ({} days)\n\nAverages:\n",
        location.name,
        location.latitude,
        location.longitude,
        first,
        last,
        series.len()
    );

    for variable in std::iter::once(Variable::TARGET).chain(Variable::FEATURES) {
        if let Some(mean) = series.mean(variable) {
            output.push_str(&format!("  {}: {:.2}\n", variable, mean));
        }
    }

    if let Some(latest) = series.records().last() {
        output.push_str(&format!("\nLatest day ({}):\n", latest.date));
        for tracked in TrackedVariable::ORDER {
            if let Some(value) = latest.get(tracked.source()) {
                output.push_str(&format!("  {}: {:.2} {}\n", tracked, value, tracked.unit()));
            }
        }
    }
    output
}

/// Formats a recommendation result the way growers receive it
pub fn format_recommendations(
    name: Option<&str>,
    location: &str,
    result: &RecommendationResult,
) -> String {
    let mut output = match name {
        Some(name) => format!(
            "Hello {}! Here are your personalized crop care recommendations for {}:\n\n",
            name, location
        ),
        None => format!("Crop care recommendations for {}:\n\n", location),
    };

    output.push_str(&format!("Conditions assessed for {}.\n", result.scored_date));
    if result.is_favorable() {
        output.push_str("The current conditions are favorable for your crops.\n");
    } else {
        output.push_str("The current conditions may pose some challenges for your crops. ");
        output.push_str("Here are some specific recommendations:\n\n");
        for rec in &result.recommendations {
            output.push_str(&format!("- [{}] {}\n", rec.grade, rec.message));
        }
    }

    output.push_str("\nMost influential factors:\n");
    for (i, f) in result.feature_importances.iter().enumerate() {
        output.push_str(&format!("  {}. {}: {:.3}\n", i + 1, f.variable, f.importance));
    }

    output.push_str(&format!(
        "\nModel accuracy: {:.1}%\n\nClassification report:\n{}\n",
        result.model_accuracy * 100.0,
        result.classification_report
    ));
    output
}
