//! Marker-bounded value runs inside a cleaned chart blob

use crate::error::ExtractError;
use crate::types::Field;

/// Substrings that open and close a field's value run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markers {
    pub start: &'static str,
    pub end: &'static str,
}

const DATE_AXIS: Markers = Markers {
    start: "categories",
    end: ",yAxis",
};

// Single-series line charts end with the responsive block
const CUMULATIVE: Markers = Markers {
    start: "data",
    end: ",resp",
};

// Daily bar charts are followed by a moving average series
const DAILY: Markers = Markers {
    start: "data",
    end: ",name",
};

pub fn markers(field: Field) -> Markers {
    match field {
        Field::DateAxis => DATE_AXIS,
        f if f.is_daily() => DAILY,
        _ => CUMULATIVE,
    }
}

/// Text strictly between the first `start` and the first `end` after it
pub fn span_between<'a>(
    text: &'a str,
    field: Field,
    markers: Markers,
) -> Result<&'a str, ExtractError> {
    let from = text
        .find(markers.start)
        .ok_or(ExtractError::MarkerNotFound {
            field,
            marker: markers.start,
        })?
        + markers.start.len();
    let len = text[from..]
        .find(markers.end)
        .ok_or(ExtractError::MarkerNotFound {
            field,
            marker: markers.end,
        })?;
    Ok(&text[from..from + len])
}

/// Split the value run for `field` into raw tokens
pub fn extract(cleaned: &str, field: Field) -> Result<Vec<String>, ExtractError> {
    let span = span_between(cleaned, field, markers(field))?.trim();
    if span.is_empty() {
        return Err(ExtractError::EmptySpan { field });
    }
    Ok(span.split(',').map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::clean;
    use crate::blob::tests::{CASES_SCRIPT, DAILY_SCRIPT};

    #[test]
    fn test_extract_dates_and_cumulative_values() {
        let cleaned = clean(CASES_SCRIPT);
        assert_eq!(
            extract(&cleaned, Field::DateAxis).unwrap(),
            vec!["Feb15", "Feb16", "Feb17"]
        );
        assert_eq!(
            extract(&cleaned, Field::TotalCases).unwrap(),
            vec!["15", "15", "null"]
        );
    }

    #[test]
    fn test_extract_daily_stops_before_moving_average() {
        let cleaned = clean(DAILY_SCRIPT);
        assert_eq!(
            extract(&cleaned, Field::DailyCases).unwrap(),
            vec!["0", "0", "2"]
        );
    }

    #[test]
    fn test_extract_from_two_series_bar_chart() {
        let script = r#"
            Highcharts.chart('graph-deaths-daily', {
                chart: { type: 'column' },
                xAxis: { categories: ["May 26","May 27","May 28"] },
                yAxis: { title: { text: 'Daily Deaths' } },
                series: [{
                    name: 'Daily Deaths',
                    color: '#999',
                    data: [3,null,5]
                },
                {
                    name: '7-day moving average',
                    type: 'line',
                    data: [2,2,3]
                }],
                responsive: { rules: [] }
            });
        "#;
        let cleaned = clean(script);
        assert_eq!(
            extract(&cleaned, Field::DateAxis).unwrap(),
            vec!["May26", "May27", "May28"]
        );
        assert_eq!(
            extract(&cleaned, Field::DailyDeaths).unwrap(),
            vec!["3", "null", "5"]
        );
    }

    #[test]
    fn test_missing_start_marker() {
        let err = extract("series name Cases ,resp", Field::TotalDeaths).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MarkerNotFound {
                field: Field::TotalDeaths,
                marker: "data"
            }
        ));
    }

    #[test]
    fn test_missing_end_marker() {
        let err = extract("categories Jan1,Jan2", Field::DateAxis).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MarkerNotFound {
                marker: ",yAxis",
                ..
            }
        ));
    }

    #[test]
    fn test_end_marker_before_start_is_ignored() {
        // an end marker preceding the start marker must not produce a reversed slice
        let err = extract(",resp data 1,2", Field::TotalCases).unwrap_err();
        assert!(matches!(err, ExtractError::MarkerNotFound { marker: ",resp", .. }));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let text = "data 1,2 ,resp data 3,4,5 ,resp";
        assert_eq!(extract(text, Field::ActiveCases).unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_empty_span_is_an_error() {
        let err = extract("data  ,resp", Field::TotalCases).unwrap_err();
        assert!(matches!(err, ExtractError::EmptySpan { field: Field::TotalCases }));
    }

    #[test]
    fn test_tokens_keep_inner_spacing() {
        // only the span as a whole is trimmed
        assert_eq!(
            extract("data 1, 2 ,resp", Field::TotalCases).unwrap(),
            vec!["1", " 2"]
        );
    }
}
