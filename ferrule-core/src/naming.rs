//! Identifier mapping between Rust names and SQL names

/// Insert `_` between a lowercase ASCII letter and a following uppercase
/// ASCII letter, then lowercase the whole string.
///
/// ```
/// use ferrule_core::naming::to_underscore;
///
/// assert_eq!(to_underscore("studentName"), "student_name");
/// assert_eq!(to_underscore("StudentInfo"), "student_info");
/// assert_eq!(to_underscore("already_snake"), "already_snake");
/// ```
pub fn to_underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for ch in name.chars() {
        if let Some(p) = prev {
            if p.is_ascii_lowercase() && ch.is_ascii_uppercase() {
                out.push('_');
            }
        }
        out.push(ch);
        prev = Some(ch);
    }
    out.to_lowercase()
}

/// Naming convention applied to derived table and column names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    underscore: bool,
    table_prefix: Option<String>,
}

impl Naming {
    pub fn new(underscore: bool, table_prefix: Option<String>) -> Self {
        Self {
            underscore,
            table_prefix: table_prefix.filter(|p| !p.is_empty()),
        }
    }

    /// Names are used exactly as declared
    pub fn passthrough() -> Self {
        Self::new(false, None)
    }

    pub fn underscore(&self) -> bool {
        self.underscore
    }

    pub fn table_prefix(&self) -> Option<&str> {
        self.table_prefix.as_deref()
    }

    /// Apply the naming transform to a single identifier
    pub fn transform(&self, name: &str) -> String {
        if self.underscore {
            to_underscore(name)
        } else {
            name.to_string()
        }
    }

    /// Column name for a field: the override wins, otherwise the transformed field name
    pub fn column_name(&self, field: &str, column_override: Option<&str>) -> String {
        match column_override {
            Some(column) => column.to_string(),
            None => self.transform(field),
        }
    }

    /// Table name for a type: the override wins, otherwise prefix plus the transformed type name
    pub fn table_name(&self, type_name: &str, table_override: Option<&str>) -> String {
        if let Some(table) = table_override {
            return table.to_string();
        }
        match &self.table_prefix {
            Some(prefix) => format!("{}{}", prefix, self.transform(type_name)),
            None => self.transform(type_name),
        }
    }
}

impl Default for Naming {
    fn default() -> Self {
        Self::new(true, None)
    }
}
