/// Fallback slug when a title has no usable characters.
const DEFAULT_SLUG: &str = "producto";

/// Turn a product title into a filename slug.
///
/// Lower-cases, keeps `[a-z0-9 áéíóúüñ]`, and joins the remaining words with
/// hyphens: `"Figura Gundam Azul!"` becomes `"figura-gundam-azul"`.
pub fn slugify(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| {
            c.is_ascii_lowercase()
                || c.is_ascii_digit()
                || c.is_whitespace()
                || matches!(c, 'á' | 'é' | 'í' | 'ó' | 'ú' | 'ü' | 'ñ')
        })
        .collect();

    let slug = kept.split_whitespace().collect::<Vec<_>>().join("-");
    if slug.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        slug
    }
}
