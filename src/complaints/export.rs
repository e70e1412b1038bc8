//! CSV rendering of complaint listings.
use chrono::NaiveDate;

use crate::models::Complaint;

const HEADER: [&str; 10] = [
    "ID",
    "Name",
    "Contact",
    "Email",
    "Category",
    "Priority",
    "Status",
    "Location",
    "Description",
    "Created At",
];

/// Quote a field if it contains a delimiter, quote or line break.
fn field(value: &str) -> std::borrow::Cow<'_, str> {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\"")).into()
    } else {
        value.into()
    }
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (i, value) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&field(value));
    }
    out.push_str("\r\n");
}

pub fn to_csv(complaints: &[Complaint]) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADER);

    for c in complaints {
        let created = c.created_at.format("%Y-%m-%d").to_string();
        push_row(
            &mut out,
            [
                c.complaint_id.as_str(),
                c.full_name.as_str(),
                c.contact_number.as_str(),
                c.email.as_deref().unwrap_or(""),
                c.category.as_str(),
                c.priority.as_str(),
                c.status.as_str(),
                c.location.as_str(),
                c.description.as_str(),
                created.as_str(),
            ],
        );
    }
    out
}

/// `complaints-YYYY-MM-DD.csv`
pub fn filename(date: NaiveDate) -> String {
    format!("complaints-{}.csv", date.format("%Y-%m-%d"))
}
