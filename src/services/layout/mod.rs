pub mod local_parser;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::models::{CellLayout, ColumnMapping, PartialCellLayout, RowRange, RowSpan, YearMonth};
use crate::sheet::column_index;

pub use local_parser::parse_instructions;

#[derive(Debug, Clone)]
pub struct HintRequest<'a> {
    pub prompt_text: &'a str,
    pub working_days: &'a [NaiveDate],
    pub client_name: &'a str,
    pub month: YearMonth,
}

/// Optional helper that turns instructions into a partial layout, typically
/// through a remote model. Any error is treated as "no hint".
#[async_trait]
pub trait LayoutHintProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn parse(&self, request: &HintRequest<'_>) -> Result<PartialCellLayout>;
}

pub struct LocalOnlyHints;

#[async_trait]
impl LayoutHintProvider for LocalOnlyHints {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn parse(&self, _request: &HintRequest<'_>) -> Result<PartialCellLayout> {
        Err(EngineError::NetworkUnavailable("no hint provider configured".to_string()).into())
    }
}

pub struct CellLayoutResolver {
    hints: Arc<dyn LayoutHintProvider>,
    timeout: Duration,
}

impl CellLayoutResolver {
    pub fn new(hints: Arc<dyn LayoutHintProvider>, timeout: Duration) -> Self {
        CellLayoutResolver { hints, timeout }
    }

    /// Resolves where to write. An explicit column mapping is used as given;
    /// otherwise the instructions are parsed, asking the hint provider first
    /// and falling back to the local parser. Always returns a layout, which
    /// may be unresolved.
    pub async fn resolve(
        &self,
        explicit: Option<&ColumnMapping>,
        instructions: Option<&str>,
        request: HintRequest<'_>,
    ) -> CellLayout {
        let instructions = instructions.map(str::trim).filter(|t| !t.is_empty());
        let local = instructions.map(parse_instructions).unwrap_or_default();

        if let Some(mapping) = explicit {
            debug!("Using explicit column mapping for {}", request.client_name);
            return CellLayout {
                column_mapping: Some(mapping.clone()),
                period_cell: instructions.and_then(local_parser::named_period_cell),
                day_number_range: None,
                hours_range: None,
                style_row_range: None,
                ..local
            };
        }

        let Some(text) = instructions else {
            return local;
        };

        let request = HintRequest {
            prompt_text: text,
            working_days: request.working_days,
            client_name: request.client_name,
            month: request.month,
        };
        match tokio::time::timeout(self.timeout, self.hints.parse(&request)).await {
            Ok(Ok(hint)) => match merge_hint(hint, &local) {
                Some(layout) => {
                    info!("Layout resolved by {} hint provider", self.hints.name());
                    layout
                }
                None => {
                    warn!("{} hint carried no usable location, using local parser", self.hints.name());
                    local
                }
            },
            Ok(Err(err)) => {
                debug!("{} hint unavailable, using local parser: {}", self.hints.name(), err);
                local
            }
            Err(_) => {
                warn!(
                    "{} hint timed out after {:?}, using local parser",
                    self.hints.name(),
                    self.timeout
                );
                local
            }
        }
    }
}

fn valid_span(span: &RowSpan) -> bool {
    span.row > 0 && column_index(&span.start_col).is_some() && column_index(&span.end_col).is_some()
}

fn valid_mapping(mapping: &ColumnMapping) -> bool {
    mapping.start_row > 0
        && column_index(&mapping.date_col).is_some()
        && column_index(&mapping.hours_col).is_some()
}

/// Combines a provider hint with the local parse. Returns `None` when the
/// hint has no usable location, in which case the local parse stands.
fn merge_hint(hint: PartialCellLayout, local: &CellLayout) -> Option<CellLayout> {
    let day_numbers = hint.day_number_range.filter(valid_span);
    let mapping = hint.column_mapping.filter(valid_mapping);
    if day_numbers.is_none() && mapping.is_none() {
        return None;
    }

    let hours_per_day = hint
        .hours_per_day
        .filter(|h| *h > 0.0 && *h <= 24.0)
        .unwrap_or(local.hours_per_day);
    let styling_disabled = hint.styling_disabled.unwrap_or(false) || local.styling_disabled;

    let mut layout = CellLayout {
        period_cell: hint.period_cell.or_else(|| local.period_cell.clone()),
        hours_per_day,
        styling_disabled,
        day_off_markers: local.day_off_markers.clone(),
        total_days_cell: local.total_days_cell.clone(),
        amount_cell: local.amount_cell.clone(),
        ..Default::default()
    };

    match day_numbers {
        Some(days) => {
            let hours = hint.hours_range.filter(valid_span).unwrap_or_else(|| RowSpan {
                row: days.row + 1,
                start_col: days.start_col.clone(),
                end_col: days.end_col.clone(),
            });
            layout.style_row_range = hint.style_row_range.or(Some(RowRange {
                start: hours.row,
                end: hours.row,
            }));
            layout.day_number_range = Some(days);
            layout.hours_range = Some(hours);
        }
        None => layout.column_mapping = mapping,
    }

    Some(layout)
}
