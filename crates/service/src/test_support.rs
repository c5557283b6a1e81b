//! Helpers for tests in this crate and, through the `test-support` feature,
//! for the HTTP crate's end-to-end tests.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::roster::{RosterPolicy, RosterStore};
use crate::storage::{KvBackend, MemoryBackend, WriteBatch};

/// Roster over a fresh in-memory backend with the default (lenient) policy.
pub fn memory_roster() -> RosterStore {
    RosterStore::new(Arc::new(MemoryBackend::new()), RosterPolicy::default())
}

/// Memory backend that can be told to fail hash reads of chosen keys or
/// every batch write.
#[derive(Default)]
pub struct FlakyBackend {
    inner: MemoryBackend,
    failing_reads: Mutex<HashSet<String>>,
    failing_writes: AtomicBool,
}

impl FlakyBackend {
    pub fn new() -> Self { Self::default() }

    pub fn fail_reads_of(&self, key: impl Into<String>) {
        self.failing_reads.lock().unwrap().insert(key.into());
    }

    pub fn fail_writes(&self, on: bool) {
        self.failing_writes.store(on, Ordering::SeqCst);
    }

    fn read_fails(&self, key: &str) -> bool {
        self.failing_reads.lock().unwrap().contains(key)
    }
}

#[async_trait]
impl KvBackend for FlakyBackend {
    async fn ping(&self) -> Result<(), ServiceError> { self.inner.ping().await }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, ServiceError> {
        self.inner.set_members(key).await
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, ServiceError> {
        self.inner.set_contains(key, member).await
    }

    async fn set_len(&self, key: &str) -> Result<usize, ServiceError> {
        self.inner.set_len(key).await
    }

    async fn set_random_member(&self, key: &str) -> Result<Option<String>, ServiceError> {
        self.inner.set_random_member(key).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, ServiceError> {
        if self.read_fails(key) {
            return Err(ServiceError::Store(format!("injected read failure for {key}")));
        }
        self.inner.hash_get_all(key).await
    }

    async fn apply(&self, batch: WriteBatch) -> Result<(), ServiceError> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::Store("injected write failure".into()));
        }
        self.inner.apply(batch).await
    }
}

const WORKBOOK_ONE_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_NO_SHEETS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets/></workbook>"#;

/// Minimal single-sheet `.xlsx` with inline string cells, one inner slice
/// per row.
pub fn xlsx_fixture(rows: &[&[&str]]) -> Vec<u8> {
    build_xlsx(WORKBOOK_ONE_SHEET, rows)
}

/// Valid `.xlsx` package whose workbook lists no sheets.
pub fn xlsx_without_sheets() -> Vec<u8> {
    build_xlsx(WORKBOOK_NO_SHEETS, &[])
}

fn build_xlsx(workbook: &str, rows: &[&[&str]]) -> Vec<u8> {
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            sheet.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                column_name(c),
                r + 1,
                xml_escape(value)
            ));
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let parts: [(&str, &str); 5] = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#,
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
        ),
        ("xl/workbook.xml", workbook),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
        ),
        ("xl/worksheets/sheet1.xml", sheet.as_str()),
    ];

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    for (name, body) in parts {
        zip.start_file(name, options).expect("zip entry");
        zip.write_all(body.as_bytes()).expect("zip write");
    }
    zip.finish().expect("zip finish").into_inner()
}

fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
