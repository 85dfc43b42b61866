/// Base forms the pipeline knows how to classify. Amendments ("/A") are included by default.
pub const TARGET_FORMS: &[&str] = &["8-K", "10-K", "4", "144"];

/// Options for filtering discovered filings
#[derive(Debug, Clone)]
pub struct FilingOptions {
    pub form_types: Vec<String>,
    /// Maximum filings kept per symbol, newest first.
    pub limit: Option<usize>,
    /// Whether to automatically include amendment forms (e.g., 8-K/A when 8-K is requested).
    /// Defaults to true.
    pub include_amendments: bool,
}

impl Default for FilingOptions {
    fn default() -> Self {
        Self {
            form_types: TARGET_FORMS.iter().map(|f| f.to_string()).collect(),
            limit: None,
            include_amendments: true,
        }
    }
}

impl FilingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form_type(mut self, form_type: impl Into<String>) -> Self {
        self.form_types = vec![form_type.into()];
        self
    }

    pub fn with_form_types(mut self, form_types: Vec<String>) -> Self {
        self.form_types = form_types;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set whether to include amendment forms automatically.
    ///
    /// When true (default), requesting "10-K" will also include "10-K/A" filings.
    /// When false, only the exact form type specified will be returned.
    pub fn with_include_amendments(mut self, include_amendments: bool) -> Self {
        self.include_amendments = include_amendments;
        self
    }

    /// Whether an EDGAR form string passes the filter.
    pub fn matches(&self, form: &str) -> bool {
        let form = form.trim();
        self.form_types.iter().any(|ft| {
            let ft = ft.trim();
            form.eq_ignore_ascii_case(ft)
                || (self.include_amendments
                    && form
                        .strip_suffix("/A")
                        .is_some_and(|base| base.eq_ignore_ascii_case(ft)))
        })
    }
}
