use crate::config::Config;
use crate::error::Result;
use crate::types::{parse_page_size, SearchQuery, SortKey, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    Language,
    Owner,
}

impl FormMode {
    pub fn label(&self) -> &'static str {
        match self {
            FormMode::Language => "Search by language",
            FormMode::Owner => "Search by owner",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Mode,
    Term,
    Sort,
    Order,
    PerPage,
    Token,
}

impl FormField {
    pub fn is_text(&self) -> bool {
        matches!(self, FormField::Term | FormField::PerPage | FormField::Token)
    }
}

/// Editable search parameters behind the search screen.
#[derive(Debug, Clone, Default)]
pub struct SearchForm {
    pub mode: FormMode,
    pub language: String,
    pub owner: String,
    pub sort: SortKey,
    pub order: SortOrder,
    pub per_page: String,
    pub token: String,
    pub field: FormField,
}

impl SearchForm {
    pub fn from_config(config: &Config) -> Self {
        Self {
            language: config.general.language.clone(),
            sort: config.general.sort,
            order: config.general.order,
            per_page: config.general.per_page.to_string(),
            ..Self::default()
        }
    }

    /// Fields visible in the current mode, top to bottom.
    pub fn fields(&self) -> &'static [FormField] {
        match self.mode {
            FormMode::Language => &[
                FormField::Mode,
                FormField::Term,
                FormField::Sort,
                FormField::Order,
                FormField::PerPage,
                FormField::Token,
            ],
            FormMode::Owner => &[
                FormField::Mode,
                FormField::Term,
                FormField::PerPage,
                FormField::Token,
            ],
        }
    }

    pub fn next_field(&mut self) {
        self.step_field(1);
    }

    pub fn prev_field(&mut self) {
        self.step_field(-1);
    }

    fn step_field(&mut self, delta: isize) {
        let fields = self.fields();
        let pos = fields.iter().position(|f| *f == self.field).unwrap_or(0) as isize;
        let len = fields.len() as isize;
        self.field = fields[(pos + delta).rem_euclid(len) as usize];
    }

    /// Cycle the value of a choice field.
    pub fn cycle(&mut self, forward: bool) {
        match self.field {
            FormField::Mode => {
                self.mode = match self.mode {
                    FormMode::Language => FormMode::Owner,
                    FormMode::Owner => FormMode::Language,
                };
            }
            FormField::Sort => {
                let all = SortKey::ALL;
                let pos = all.iter().position(|k| *k == self.sort).unwrap_or(0);
                let next = if forward {
                    (pos + 1) % all.len()
                } else {
                    (pos + all.len() - 1) % all.len()
                };
                self.sort = all[next];
            }
            FormField::Order => self.order = self.order.toggled(),
            _ => {}
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.field {
            FormField::Term => Some(match self.mode {
                FormMode::Language => &mut self.language,
                FormMode::Owner => &mut self.owner,
            }),
            FormField::PerPage => Some(&mut self.per_page),
            FormField::Token => Some(&mut self.token),
            _ => None,
        }
    }

    pub fn input(&mut self, c: char) {
        if self.field == FormField::PerPage && !c.is_ascii_digit() {
            return;
        }
        if let Some(text) = self.text_mut() {
            text.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.text_mut() {
            text.pop();
        }
    }

    pub fn term(&self) -> &str {
        match self.mode {
            FormMode::Language => &self.language,
            FormMode::Owner => &self.owner,
        }
    }

    /// Build the query for a new search. A token typed into the form takes
    /// precedence over the one discovered at startup.
    pub fn build_query(&self, default_token: Option<&str>) -> Result<SearchQuery> {
        let per_page = parse_page_size(&self.per_page);
        let token = match self.token.trim() {
            "" => default_token.map(str::to_string),
            typed => Some(typed.to_string()),
        };

        match self.mode {
            FormMode::Language => Ok(SearchQuery::by_language(
                &self.language,
                self.sort,
                self.order,
                per_page,
                token,
            )),
            FormMode::Owner => SearchQuery::by_owner(&self.owner, per_page, token),
        }
    }
}
