//! Tabular file schema definitions
//!
//! Column labels and file names of the intermediate CSV files. Downstream
//! consumers (charts, spreadsheets) rely on the exact labels and order.

/// Intermediate file names inside the data directory
pub mod files {
    /// One row per (person, phone number)
    pub const CONTACTS: &str = "contacts.csv";
    /// Raw message export
    pub const CHAT_DATA: &str = "all_chat_data.csv";
    /// Message export with malformed rows dropped and every field quoted
    pub const FORMATTED_CHAT_DATA: &str = "formatted_all_chat_data.csv";
    /// Identity-resolved messages, the hand-off artifact
    pub const PROCESSED_MESSAGES: &str = "processed_messages.csv";
    /// Source fingerprints of the last resolved run
    pub const MANIFEST: &str = "processed_manifest.json";
}

/// `contacts.csv` columns
pub mod contacts_csv {
    /// Trimmed "first last"
    pub const FULL_NAME: &str = "Full Name";
    /// First name column
    pub const FIRST_NAME: &str = "First Name";
    /// Last name column
    pub const LAST_NAME: &str = "Last Name";
    /// Normalized phone key column
    pub const PHONE_NUMBER: &str = "Phone Number";

    /// Header row in file order
    pub const HEADER: [&str; 4] = [FULL_NAME, FIRST_NAME, LAST_NAME, PHONE_NUMBER];
}

/// Message table columns shared by the raw, formatted and processed files
pub mod chat_csv {
    /// Unix seconds
    pub const TIMESTAMP: &str = "Timestamp";
    /// Local time, `%Y-%m-%d %H:%M:%S`
    pub const READABLE_TIME: &str = "Readable Time";
    /// Sender handle, "Me", or resolved name
    pub const SENDER: &str = "Sender";
    /// Handle row id
    pub const SENDER_ID: &str = "Sender ID";
    /// Message body
    pub const MESSAGE: &str = "Message";
    /// 1 for group chats
    pub const GROUP_CHAT: &str = "Group Chat";
    /// Group display name
    pub const GROUP_CHAT_NAME: &str = "Group Chat Name";
    /// 1 when authored locally
    pub const SENT_BY_ME: &str = "Sent by Me";
    /// Counterpart handle in the raw and formatted files
    pub const CONTACT_IDENTIFIER: &str = "Contact Identifier";
    /// Counterpart column label in the processed file
    pub const TO: &str = "To";

    /// Raw and formatted header in file order
    pub const HEADER: [&str; 9] = [
        TIMESTAMP,
        READABLE_TIME,
        SENDER,
        SENDER_ID,
        MESSAGE,
        GROUP_CHAT,
        GROUP_CHAT_NAME,
        SENT_BY_ME,
        CONTACT_IDENTIFIER,
    ];

    /// Processed header in file order
    pub const PROCESSED_HEADER: [&str; 9] = [
        TIMESTAMP,
        READABLE_TIME,
        SENDER,
        SENDER_ID,
        MESSAGE,
        GROUP_CHAT,
        GROUP_CHAT_NAME,
        SENT_BY_ME,
        TO,
    ];

    /// Readable time format
    pub const READABLE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
}
