//! JavaScript snippets evaluated through [`PageCapability::evaluate`].
//!
//! [`PageCapability::evaluate`]: super::PageCapability::evaluate

/// Quote a selector or attribute name as a JS string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Scroll to the bottom of the document and report its height.
pub fn scroll_and_measure() -> String {
    "(() => { window.scrollTo(0, document.body.scrollHeight); return document.body.scrollHeight; })()"
        .to_string()
}

/// `true` if some element matches `selector`.
pub fn exists(selector: &str) -> String {
    format!("document.querySelector({}) !== null", js_string(selector))
}

/// `id` attribute of every element matching `selector`, in document order.
pub fn element_ids(selector: &str) -> String {
    format!(
        "Array.from(document.querySelectorAll({})).map(el => el.id)",
        js_string(selector)
    )
}

/// Attribute of the first element matching `selector`, or `null`.
pub fn attribute(selector: &str, attr: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); return el ? el.getAttribute({}) : null; }})()",
        js_string(selector),
        js_string(attr)
    )
}

/// Attribute of every `item` inside the first `container`, in document order.
pub fn attributes_within(container: &str, item: &str, attr: &str) -> String {
    format!(
        "(() => {{ const root = document.querySelector({}); if (!root) return []; \
         return Array.from(root.querySelectorAll({})).map(el => el.getAttribute({})).filter(v => v); }})()",
        js_string(container),
        js_string(item),
        js_string(attr)
    )
}

/// `innerText` of the first element matching `selector`, or `null`.
pub fn inner_text(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); return el ? el.innerText : null; }})()",
        js_string(selector)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_quoted() {
        let script = attribute(r#"video > source[label="720"]"#, "src");
        assert!(script.contains(r#"document.querySelector("video > source[label=\"720\"]")"#));
        assert!(script.contains(r#"getAttribute("src")"#));
    }

    #[test]
    fn presence_check_is_a_plain_boolean() {
        assert_eq!(
            exists(".post-purchase"),
            r#"document.querySelector(".post-purchase") !== null"#
        );
    }

    #[test]
    fn gallery_script_scopes_to_container() {
        let script = attributes_within(".swiper-wrapper", "img", "src");
        assert!(script.starts_with("(() => {"));
        assert!(script.contains(r#"document.querySelector(".swiper-wrapper")"#));
        assert!(script.contains(r#"root.querySelectorAll("img")"#));
    }
}
