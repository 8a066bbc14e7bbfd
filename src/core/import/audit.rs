use super::ItemReport;

/// One line per stored item, stable and greppable. Empty lists render as `[]`
/// rather than being omitted.
pub fn format_audit_line(
    title: &str,
    categories: &[String],
    tags: &[String],
    images: &[String],
) -> String {
    format!(
        "imported '{title}' categorias: {} tags: {} imagenes: {}",
        render_list(categories),
        render_list(tags),
        render_list(images)
    )
}

pub fn record_item(report: &ItemReport) {
    tracing::info!(
        "{}",
        format_audit_line(&report.title, &report.categories, &report.tags, &report.images)
    );
    for warning in &report.warnings {
        tracing::warn!("'{}' {warning}", report.title);
    }
}

fn render_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}
