//! Title decoration for private and protected entries.

/// Template that renders a title unchanged.
pub const IDENTITY_TITLE_FORMAT: &str = "%s";

const TITLE_PLACEHOLDER: &str = "%s";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleFormatSlot {
    Private,
    Protected,
    Other,
}

/// Replaces the `Private: ` / `Protected: ` prefixes with the bare title.
pub fn title_format(slot: TitleFormatSlot, template: &str) -> &str {
    match slot {
        TitleFormatSlot::Private | TitleFormatSlot::Protected => IDENTITY_TITLE_FORMAT,
        TitleFormatSlot::Other => template,
    }
}

/// Substitutes `title` for the first `%s` in `template`.
pub fn format_title(template: &str, title: &str) -> String {
    template.replacen(TITLE_PLACEHOLDER, title, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_and_protected_prefixes_are_dropped() {
        for slot in [TitleFormatSlot::Private, TitleFormatSlot::Protected] {
            let template = title_format(slot, "Private: %s");
            assert_eq!(format_title(template, "Episode 12"), "Episode 12");
        }
    }

    #[test]
    fn other_templates_pass_through() {
        let template = title_format(TitleFormatSlot::Other, "Draft: %s");
        assert_eq!(format_title(template, "Episode 12"), "Draft: Episode 12");
    }

    #[test]
    fn template_without_placeholder_is_returned_as_is() {
        assert_eq!(format_title("Untitled", "Episode 12"), "Untitled");
    }
}
