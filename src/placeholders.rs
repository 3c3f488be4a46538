//! Placeholder tokens and their resolved values for one project.

use crate::project::Project;

/// A template field. Each field is recognized as `{{Key}}` and `{{ Key }}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Date,
    Attn,
    ContractorName,
    ContractorEmail,
    JobContact,
    JobContactPhone,
    StreetAdd,
    CityAdd,
    TotalPrice,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Name,
        Field::Date,
        Field::Attn,
        Field::ContractorName,
        Field::ContractorEmail,
        Field::JobContact,
        Field::JobContactPhone,
        Field::StreetAdd,
        Field::CityAdd,
        Field::TotalPrice,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Date => "Date",
            Field::Attn => "Attn",
            Field::ContractorName => "ContractorName",
            Field::ContractorEmail => "ContractorEmail",
            Field::JobContact => "JobContact",
            Field::JobContactPhone => "JobContactPhone",
            Field::StreetAdd => "StreetAdd",
            Field::CityAdd => "CityAdd",
            Field::TotalPrice => "TotalPrice",
        }
    }

    /// Contractor fields are authored with inconsistent spacing and case,
    /// and are always replaced inside the run that holds them.
    pub fn is_contractor(self) -> bool {
        matches!(self, Field::ContractorName | Field::ContractorEmail)
    }

    pub fn token(self) -> String {
        format!("{{{{{}}}}}", self.key())
    }

    pub fn spaced_token(self) -> String {
        format!("{{{{ {} }}}}", self.key())
    }

    /// The token with whitespace stripped and lowercased, as matched
    /// against normalized text.
    pub fn normalized_token(self) -> String {
        normalize(&self.token())
    }
}

/// Strip all whitespace and lowercase.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub field: Field,
    pub token: String,
    pub value: String,
}

/// Token → value pairs, applied in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceholderMap {
    entries: Vec<Placeholder>,
}

impl PlaceholderMap {
    /// Register both spellings of the field's token.
    pub fn insert(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        self.entries.retain(|p| p.field != field);
        self.entries.push(Placeholder {
            field,
            token: field.token(),
            value: value.clone(),
        });
        self.entries.push(Placeholder {
            field,
            token: field.spaced_token(),
            value,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.entries.iter()
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|p| p.token == token)
            .map(|p| p.value.as_str())
    }

    pub fn value(&self, field: Field) -> Option<&str> {
        self.entries
            .iter()
            .find(|p| p.field == field)
            .map(|p| p.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the map for a project. Missing fields resolve to empty strings.
    pub fn for_project(project: &Project) -> Self {
        let address = project.address_parts();
        let text = |v: &Option<String>| v.as_deref().unwrap_or("").to_string();

        let mut map = PlaceholderMap::default();
        map.insert(Field::Name, project.name.clone());
        map.insert(Field::Date, project.formatted_date());
        map.insert(Field::Attn, text(&project.attn));
        map.insert(Field::ContractorName, text(&project.contractor_name));
        map.insert(Field::ContractorEmail, text(&project.contractor_email));
        map.insert(Field::JobContact, text(&project.job_contact));
        map.insert(Field::JobContactPhone, text(&project.job_contact_phone));
        map.insert(Field::StreetAdd, address.street);
        map.insert(Field::CityAdd, address.city_state_zip);
        map.insert(Field::TotalPrice, format_currency(project.total_price()));
        map
    }
}

/// `$1,234.50`, or an empty string for a zero total.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    if cents == 0 {
        return String::new();
    }
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}
