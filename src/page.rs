/// Standalone HTML page shell around a converted fragment
use crate::renderer::{escape_attribute, escape_html};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Converted Markdown";
pub const DEFAULT_LANG: &str = "en";
pub const DEFAULT_BODY_STYLE: &str = "font-family: Arial, sans-serif; margin: 20px;";

/// The fixed document shell: doctype, charset, title and body style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageShell {
    pub title: String,
    pub lang: String,
    pub body_style: String,
}

impl PageShell {
    pub fn new(title: impl Into<String>) -> Self {
        PageShell {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Embed a fragment. Pure templating: the same inputs always give the same bytes.
    pub fn wrap(&self, fragment: &str) -> String {
        format!(
            "<!DOCTYPE html>\n\
             <html lang=\"{lang}\">\n\
             <head>\n    \
             <meta charset=\"UTF-8\">\n    \
             <title>{title}</title>\n\
             </head>\n\
             <body style=\"{style}\">\n    \
             {fragment}\n\
             </body>\n\
             </html>",
            lang = escape_attribute(&self.lang),
            title = escape_html(&self.title),
            style = escape_attribute(&self.body_style),
            fragment = fragment,
        )
    }
}

impl Default for PageShell {
    fn default() -> Self {
        PageShell {
            title: DEFAULT_TITLE.to_string(),
            lang: DEFAULT_LANG.to_string(),
            body_style: DEFAULT_BODY_STYLE.to_string(),
        }
    }
}

/// Wrap a fragment in the default shell with the given title
pub fn wrap_fragment_as_document(fragment: &str, title: &str) -> String {
    PageShell::new(title).wrap(fragment)
}
