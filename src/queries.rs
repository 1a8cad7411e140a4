//! SQL run against the two read-only source stores.

/// Chat style code the message store uses for multi-party chats
pub const GROUP_CHAT_STYLE: i64 = 43;

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z
pub const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

/// Every message with text, newest first.
///
/// Columns: date, is_from_me, handle id, handle row id, text, chat style,
/// chat display name, chat identifier.
pub const ALL_MESSAGES: &str = r"
SELECT
    message.date,
    message.is_from_me,
    handle.id,
    handle.ROWID,
    message.text,
    chat.style,
    chat.display_name,
    chat.chat_identifier
FROM message
LEFT JOIN handle ON message.handle_id = handle.ROWID
LEFT JOIN chat_message_join ON message.ROWID = chat_message_join.message_id
LEFT JOIN chat ON chat_message_join.chat_id = chat.ROWID
WHERE message.text IS NOT NULL
ORDER BY message.date DESC
";

/// One row per named person with their numbers joined by `"; "`.
///
/// Columns: first name, last name, phones.
pub const ALL_CONTACTS: &str = r"
SELECT
    COALESCE(ZABCDRECORD.ZFIRSTNAME, '') AS first_name,
    COALESCE(ZABCDRECORD.ZLASTNAME, '') AS last_name,
    (SELECT GROUP_CONCAT(ZFULLNUMBER, '; ')
     FROM ZABCDPHONENUMBER
     WHERE ZABCDPHONENUMBER.ZOWNER = ZABCDRECORD.Z_PK) AS phones
FROM ZABCDRECORD
WHERE ZFIRSTNAME IS NOT NULL
   OR ZLASTNAME IS NOT NULL
ORDER BY TRIM(COALESCE(ZABCDRECORD.ZFIRSTNAME, '') || ' ' || COALESCE(ZABCDRECORD.ZLASTNAME, ''))
";

/// Separator `ALL_CONTACTS` joins phone numbers with
pub const PHONE_DELIMITER: &str = "; ";
