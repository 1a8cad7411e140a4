//! Contact extraction.
//!
//! Reads every named person from the contacts store and writes `contacts.csv`
//! with one row per (person, phone number). Rows are collected in memory and
//! the file is staged then renamed, so a failed run leaves no output behind.

use std::path::Path;

use tracing::{debug, info};

use crate::csv_codec::{self, Quoting, TableWriter};
use crate::error::Result;
use crate::models::{Contact, ContactRow};
use crate::phone::{normalize, NormalizedPhone};
use crate::queries::{ALL_CONTACTS, PHONE_DELIMITER};
use crate::schema::{contacts_csv, files};
use crate::store::{lossy_text, SourceStore};

/// Outcome of writing `contacts.csv`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactExport {
    /// People read from the store
    pub contacts: usize,
    /// Rows written (one per phone number)
    pub rows: usize,
}

/// Rows read back from `contacts.csv`
#[derive(Debug, Clone, Default)]
pub struct ContactTable {
    /// Well-formed rows in file order
    pub rows: Vec<ContactRow>,
    /// Malformed rows dropped
    pub skipped: usize,
}

/// Split a `"; "`-joined phone field and normalize each entry
fn split_phones(joined: &str) -> impl Iterator<Item = NormalizedPhone> + '_ {
    joined
        .split(PHONE_DELIMITER)
        .map(normalize)
        .filter(|phone| !phone.is_empty())
}

/// Query every person with a first or last name
pub fn extract_contacts(store: &SourceStore) -> Result<Vec<Contact>> {
    let mut stmt = store.prepare(ALL_CONTACTS)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                lossy_text(row, 0)?.unwrap_or_default(),
                lossy_text(row, 1)?.unwrap_or_default(),
                lossy_text(row, 2)?,
            ))
        })
        .map_err(|e| store.access_error(e))?;

    let mut contacts = Vec::new();
    for row in rows {
        let (first_name, last_name, phones) = row.map_err(|e| store.access_error(e))?;
        let mut contact = Contact::new(&first_name, &last_name);
        contact.phone_numbers = split_phones(phones.as_deref().unwrap_or_default()).collect();
        if contact.phone_numbers.is_empty() {
            debug!(name = %contact.full_name, "Contact has no phone numbers");
        }
        contacts.push(contact);
    }

    Ok(contacts)
}

/// Extract contacts from the store at `store_path` into `data_dir/contacts.csv`
pub fn export_contacts(store_path: &Path, data_dir: &Path) -> Result<ContactExport> {
    let store = SourceStore::open(store_path)?;
    info!(path = %store.path().display(), "Reading contacts");
    let contacts = extract_contacts(&store)?;

    let dest = data_dir.join(files::CONTACTS);
    let staged = csv_codec::staging_path(&dest);
    let mut writer = TableWriter::create(&staged, &contacts_csv::HEADER, Quoting::Always)?;
    for row in contacts.iter().flat_map(Contact::rows) {
        writer.write_row(row.to_record())?;
    }
    let rows = writer.rows_written();
    writer.finish()?;
    csv_codec::commit_staged(&dest)?;

    info!(contacts = contacts.len(), rows, path = %dest.display(), "Contacts saved");
    Ok(ContactExport {
        contacts: contacts.len(),
        rows,
    })
}

/// Read `contacts.csv` back into rows
pub fn read_contacts(path: &Path) -> Result<ContactTable> {
    let table = csv_codec::read_table_file(path)?;
    let file = files::CONTACTS;
    let full_name = table.require_column(contacts_csv::FULL_NAME, file)?;
    let first_name = table.require_column(contacts_csv::FIRST_NAME, file)?;
    let last_name = table.require_column(contacts_csv::LAST_NAME, file)?;
    let phone_number = table.require_column(contacts_csv::PHONE_NUMBER, file)?;

    let rows = table
        .rows
        .iter()
        .map(|row| ContactRow {
            full_name: row[full_name].trim().to_string(),
            first_name: row[first_name].clone(),
            last_name: row[last_name].clone(),
            phone_number: normalize(&row[phone_number]),
        })
        .collect();

    Ok(ContactTable {
        rows,
        skipped: table.skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_phones() {
        let phones: Vec<String> = split_phones("(555) 123-4567; +44 20 7946 0958; ")
            .map(|p| p.to_string())
            .collect();
        assert_eq!(phones, vec!["15551234567", "442079460958"]);
    }
}
