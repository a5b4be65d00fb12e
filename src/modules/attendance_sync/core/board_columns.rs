/// Column ids of the monday.com board the attendances are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardColumns {
    pub start: String,
    pub end: String,
    pub duration: String,
    pub external_reference: String,
    pub employee: Option<String>,
    pub email: Option<String>,
}

impl Default for BoardColumns {
    fn default() -> Self {
        Self {
            start: "date4".into(),
            end: "date_mkzm3eqt".into(),
            duration: "numeric_mkzm4ydj".into(),
            external_reference: "text_mkzm7ea3".into(),
            employee: None,
            email: None,
        }
    }
}

impl BoardColumns {
    /// Every configured column id, in projection order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids = vec![
            self.start.as_str(),
            self.duration.as_str(),
            self.external_reference.as_str(),
        ];
        ids.extend(self.employee.as_deref());
        ids.extend(self.email.as_deref());
        ids.push(self.end.as_str());
        ids
    }

    /// First column id that is configured more than once, if any.
    pub fn duplicate(&self) -> Option<&str> {
        let ids = self.ids();
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Some(*id);
            }
        }
        None
    }
}
