use crate::pipeline::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Date,
    Time,
    ItemName,
    Amount,
    WeekdayRank,
    MonthRank,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::Date,
        CanonicalField::Time,
        CanonicalField::ItemName,
        CanonicalField::Amount,
        CanonicalField::WeekdayRank,
        CanonicalField::MonthRank,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::Time => "time",
            CanonicalField::ItemName => "item_name",
            CanonicalField::Amount => "amount",
            CanonicalField::WeekdayRank => "weekday_rank",
            CanonicalField::MonthRank => "month_rank",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

/// Maps source column labels (synonyms) onto canonical fields.
///
/// Labels are compared after trimming surrounding whitespace on both sides. When several
/// headers map to the same field, the left-most header wins.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    synonyms: Vec<(String, CanonicalField)>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::empty()
            .with_synonym("Date", CanonicalField::Date)
            .with_synonym("date", CanonicalField::Date)
            .with_synonym("Time", CanonicalField::Time)
            .with_synonym("time", CanonicalField::Time)
            .with_synonym("coffee_name", CanonicalField::ItemName)
            .with_synonym("Menu_Name", CanonicalField::ItemName)
            .with_synonym("item_name", CanonicalField::ItemName)
            .with_synonym("money", CanonicalField::Amount)
            .with_synonym("amount", CanonicalField::Amount)
            .with_synonym("Weekdaysort", CanonicalField::WeekdayRank)
            .with_synonym("Weeksort", CanonicalField::WeekdayRank)
            .with_synonym("weekday_rank", CanonicalField::WeekdayRank)
            .with_synonym("Monthsort", CanonicalField::MonthRank)
            .with_synonym("month_rank", CanonicalField::MonthRank)
    }
}

impl ColumnMap {
    pub fn empty() -> Self {
        Self {
            synonyms: Vec::new(),
        }
    }

    pub fn with_synonym(mut self, label: impl Into<String>, field: CanonicalField) -> Self {
        let label = label.into().trim().to_string();
        self.synonyms.retain(|(existing, _)| *existing != label);
        self.synonyms.push((label, field));
        self
    }

    pub fn field_for(&self, label: &str) -> Option<CanonicalField> {
        let label = label.trim();
        self.synonyms
            .iter()
            .find(|(synonym, _)| synonym == label)
            .map(|(_, field)| *field)
    }

    pub fn labels_for(&self, field: CanonicalField) -> Vec<&str> {
        self.synonyms
            .iter()
            .filter(|(_, f)| *f == field)
            .map(|(label, _)| label.as_str())
            .collect()
    }

    /// Locates every canonical field in `headers`. Required fields are checked in the
    /// order date, amount, item name.
    pub fn resolve(&self, headers: &[String]) -> Result<ResolvedColumns, PipelineError> {
        let mut resolved = ResolvedColumns::default();
        for (idx, header) in headers.iter().enumerate() {
            let Some(field) = self.field_for(header) else {
                continue;
            };
            let slot = resolved.slot_mut(field);
            if slot.is_none() {
                *slot = Some(idx);
            }
        }

        for field in [
            CanonicalField::Date,
            CanonicalField::Amount,
            CanonicalField::ItemName,
        ] {
            if resolved.get(field).is_none() {
                return Err(PipelineError::Schema {
                    column: field.as_str(),
                    accepted: self.labels_for(field).join(", "),
                });
            }
        }

        Ok(resolved)
    }
}

/// Column positions located by [`ColumnMap::resolve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedColumns {
    date: Option<usize>,
    time: Option<usize>,
    item_name: Option<usize>,
    amount: Option<usize>,
    weekday_rank: Option<usize>,
    month_rank: Option<usize>,
}

impl ResolvedColumns {
    pub fn get(&self, field: CanonicalField) -> Option<usize> {
        match field {
            CanonicalField::Date => self.date,
            CanonicalField::Time => self.time,
            CanonicalField::ItemName => self.item_name,
            CanonicalField::Amount => self.amount,
            CanonicalField::WeekdayRank => self.weekday_rank,
            CanonicalField::MonthRank => self.month_rank,
        }
    }

    fn slot_mut(&mut self, field: CanonicalField) -> &mut Option<usize> {
        match field {
            CanonicalField::Date => &mut self.date,
            CanonicalField::Time => &mut self.time,
            CanonicalField::ItemName => &mut self.item_name,
            CanonicalField::Amount => &mut self.amount,
            CanonicalField::WeekdayRank => &mut self.weekday_rank,
            CanonicalField::MonthRank => &mut self.month_rank,
        }
    }
}
