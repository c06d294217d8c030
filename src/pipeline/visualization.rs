use crate::model::{DynamicValue, Object};

/// Flatten a visualization (calendar) response into an array of objects
///
/// Reads `finance.result[0].documents[0]`, pairing each row array with the
/// `label` of the column at the same position. Unlabelled columns are dropped,
/// non-array rows pass through unchanged, and a payload without that document
/// shape is returned as-is.
pub fn flatten_visualization(payload: &DynamicValue) -> DynamicValue {
    let Some(document) = payload.value_at(&["finance", "result", "0", "documents", "0"]) else {
        return payload.clone();
    };
    let (Some(columns), Some(rows)) = (
        document.get("columns").and_then(DynamicValue::as_array),
        document.get("rows").and_then(DynamicValue::as_array),
    ) else {
        return payload.clone();
    };

    let labels: Vec<&str> = columns
        .iter()
        .map(|column| column.get("label").and_then(DynamicValue::as_str).unwrap_or_default())
        .collect();

    rows.iter()
        .map(|row| match row.as_array() {
            Some(cells) => {
                let object: Object = labels
                    .iter()
                    .zip(cells)
                    .filter(|(label, _)| !label.is_empty())
                    .map(|(label, cell)| (label.to_string(), cell.clone()))
                    .collect();
                DynamicValue::Object(object)
            }
            None => row.clone(),
        })
        .collect::<Vec<_>>()
        .into()
}
