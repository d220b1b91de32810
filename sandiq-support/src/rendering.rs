//! Text rendering for diagnostics.
//!
//! Fatal container errors print the resolution path that led to them and
//! the types involved. These helpers keep that output short and readable.

/// Renders a resolution path as an arrow-separated string.
///
/// # Examples
/// ```
/// use sandiq_support::rendering::render_chain;
///
/// let chain = vec!["app::orders", "app::billing", "app::orders"];
/// assert_eq!(render_chain(&chain), "app::orders → app::billing → app::orders");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders a set of names as a sorted, comma-separated list.
///
/// Sorting keeps log output stable across runs even though the underlying
/// sets are hash-ordered.
///
/// ```
/// use sandiq_support::rendering::render_set;
///
/// assert_eq!(render_set(["b", "a"]), "{a, b}");
/// assert_eq!(render_set(Vec::<&str>::new()), "{}");
/// ```
pub fn render_set<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<String> = names.into_iter().map(|s| s.as_ref().to_owned()).collect();
    names.sort();
    format!("{{{}}}", names.join(", "))
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use sandiq_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::user::UserService");
/// assert_eq!(short, "UserService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                current_segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '&' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => current_segment.push(ch),
        }
    }

    result.push_str(&current_segment);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_cycle_chain() {
        let chain = vec!["four", "five", "four"];
        assert_eq!(render_chain(&chain), "four → five → four");
    }

    #[test]
    fn render_single_element_chain() {
        assert_eq!(render_chain(&["a"]), "a");
    }

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn render_set_is_sorted() {
        assert_eq!(render_set(["three", "one", "two"]), "{one, three, two}");
    }

    #[test]
    fn shorten_simple_path() {
        assert_eq!(shorten_type_name("my_app::services::UserService"), "UserService");
    }

    #[test]
    fn shorten_with_generics() {
        assert_eq!(
            shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>"),
            "Arc<dyn Logger>"
        );
    }

    #[test]
    fn shorten_tuple_and_reference() {
        assert_eq!(shorten_type_name("(alloc::string::String, &core::primitive::u8)"), "(String, &u8)");
    }

    #[test]
    fn shorten_no_path() {
        assert_eq!(shorten_type_name("String"), "String");
    }
}
