use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::OnceLock;

pub const CONTRACT_ID: &str = "daysheet.schedule_contract";
pub const CONTRACT_VERSION: &str = "1";

/// Field names carried by schedule records, as produced by the booking import.
pub mod fields {
    pub const TIME: &str = "time";
    pub const VISIT_NUMBER: &str = "visitNumber";
    pub const RECIPIENT_NAME: &str = "recipientName";
    pub const DONOR_NAME: &str = "donorName";
    pub const PHONE_NUMBER: &str = "phoneNumber";
    pub const TREATMENT_REQUIRED: &str = "treatmentRequired";
    pub const TREATMENT_NAME: &str = "treatmentName";
    pub const RECIPIENT_BLOOD_TYPE: &str = "recipientBloodType";
    pub const DONOR_BLOOD_TYPE: &str = "donorBloodType";
    pub const DOCTOR_NAME: &str = "doctorName";
    pub const PICKED: &str = "picked";
    pub const PAID: &str = "paid";
    pub const DONE: &str = "done";
    pub const NUMBER_OF_TUBES: &str = "numberOfTubes";
    pub const TS: &str = "ts";
    pub const TS_RPM: &str = "tsRPM";
    pub const SN: &str = "sn";
    pub const SN_RPM: &str = "snRPM";
    pub const IY: &str = "iy";
}

/// One appointment entry. Values are opaque strings; absent fields read as "".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Decodes a JSON array of flat string objects, keeping array order.
    pub fn list_from_json(json: &str) -> Result<Vec<Record>, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn list_to_json(records: &[Record]) -> Result<String, serde_json::Error> {
        serde_json::to_string(records)
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnDef {
    pub label: &'static str,
    pub width: f32,
}

const fn col(label: &'static str, width: f32) -> ColumnDef {
    ColumnDef { label, width }
}

const LAB_COLUMN_WIDTH: f32 = 55.0;

pub const PATIENT_COLUMNS: [ColumnDef; 11] = [
    col("No", 28.0),
    col("Time", 50.0),
    col("Visit", 45.0),
    col("Recipient Name", 110.0),
    col("Donor Name", 110.0),
    col("Phone Number", 90.0),
    col("Treatment", 190.0),
    col("Picked", 45.0),
    col("Paid", 40.0),
    col("Done", 40.0),
    col("No", 25.0),
];

pub const BLOOD_TUBE_COLUMNS: [ColumnDef; 5] = [
    col("No", 25.0),
    col("Horario", 60.0),
    col("Hombre - Donante", 150.0),
    col("Mujer - Recipient", 150.0),
    col("Numero de Tubos", 100.0),
];

pub const LAB_COLUMNS: [ColumnDef; 12] = [
    col("No", 25.0),
    col("Time", 50.0),
    col("LIT", 160.0),
    col("Visita", 40.0),
    col("Nombre Mujer", 100.0),
    col("Nombre Hombre", 100.0),
    col("TS", LAB_COLUMN_WIDTH - 10.0),
    col("1500rpm\n19min", LAB_COLUMN_WIDTH),
    col("SN", LAB_COLUMN_WIDTH - 10.0),
    col("2200rpm\n10min", LAB_COLUMN_WIDTH),
    col("IY", LAB_COLUMN_WIDTH - 10.0),
    col("Done", 40.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Patients,
    BloodTubes,
    Laboratory,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableDef {
    pub kind: TableKind,
    pub title: &'static str,
    pub columns: &'static [ColumnDef],
    pub min_row_height: f32,
    pub header_height: f32,
}

pub const TABLE_DEFS_V1: [TableDef; 3] = [
    TableDef {
        kind: TableKind::Patients,
        title: "Pacientes",
        columns: &PATIENT_COLUMNS,
        min_row_height: 45.0,
        header_height: 20.0,
    },
    TableDef {
        kind: TableKind::BloodTubes,
        title: "Tubos de Sangre",
        columns: &BLOOD_TUBE_COLUMNS,
        min_row_height: 45.0,
        header_height: 20.0,
    },
    TableDef {
        kind: TableKind::Laboratory,
        title: "Laboratorio",
        columns: &LAB_COLUMNS,
        min_row_height: 45.0,
        header_height: 30.0,
    },
];

pub fn table_defs_v1() -> &'static [TableDef] {
    &TABLE_DEFS_V1
}

pub fn table_def(kind: TableKind) -> &'static TableDef {
    match kind {
        TableKind::Patients => &TABLE_DEFS_V1[0],
        TableKind::BloodTubes => &TABLE_DEFS_V1[1],
        TableKind::Laboratory => &TABLE_DEFS_V1[2],
    }
}

/// "IUI - 100 USD" -> "IUI". Everything before the first " -".
pub fn treatment_name(treatment_required: &str) -> String {
    treatment_required
        .split(" -")
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// "Visit 2" -> " 2"; whitespace is left for the table cell to absorb.
pub fn visit_number(visit_answer: &str) -> String {
    visit_answer.replacen("Visit", "", 1)
}

pub fn strip_currency(treatment_required: &str) -> String {
    treatment_required.replacen("USD", "", 1)
}

/// Raw answers of one booking, as read from the booking form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingAnswers<'a> {
    pub time: &'a str,
    pub recipient_first_name: &'a str,
    pub recipient_last_name: &'a str,
    pub recipient_blood_type: &'a str,
    pub donor_name: &'a str,
    pub donor_blood_type: &'a str,
    pub doctor_name: &'a str,
    pub phone_number: &'a str,
    pub treatment_required: &'a str,
    pub visit: &'a str,
}

/// Applies the import shaping rules to raw booking answers.
pub fn shape_record(answers: &BookingAnswers<'_>) -> Record {
    let recipient = format!(
        "{} {}",
        answers.recipient_first_name, answers.recipient_last_name
    );
    Record::new()
        .with(fields::TIME, answers.time)
        .with(fields::RECIPIENT_NAME, recipient.trim())
        .with(fields::DONOR_NAME, answers.donor_name)
        .with(fields::PHONE_NUMBER, answers.phone_number)
        .with(
            fields::TREATMENT_REQUIRED,
            strip_currency(answers.treatment_required),
        )
        .with(
            fields::TREATMENT_NAME,
            treatment_name(answers.treatment_required),
        )
        .with(fields::RECIPIENT_BLOOD_TYPE, answers.recipient_blood_type)
        .with(fields::DONOR_BLOOD_TYPE, answers.donor_blood_type)
        .with(fields::DOCTOR_NAME, answers.doctor_name)
        .with(fields::VISIT_NUMBER, visit_number(answers.visit))
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

static SCHEMA_FINGERPRINT: OnceLock<String> = OnceLock::new();

pub fn schema_json() -> Value {
    let tables: Vec<Value> = TABLE_DEFS_V1
        .iter()
        .map(|table| {
            let columns: Vec<Value> = table
                .columns
                .iter()
                .map(|c| json!({ "label": c.label, "width": c.width }))
                .collect();
            json!({
                "title": table.title,
                "min_row_height": table.min_row_height,
                "header_height": table.header_height,
                "columns": columns,
            })
        })
        .collect();
    json!({
        "contract": CONTRACT_ID,
        "version": CONTRACT_VERSION,
        "tables": tables,
    })
}

pub fn schema_fingerprint_sha256() -> String {
    SCHEMA_FINGERPRINT
        .get_or_init(|| {
            let payload = schema_json().to_string();
            hex_sha256(payload.as_bytes())
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_read_as_empty() {
        let record = Record::new().with(fields::DONOR_NAME, "Beto Ruiz");
        assert_eq!(record.get(fields::DONOR_NAME), "Beto Ruiz");
        assert_eq!(record.get(fields::PHONE_NUMBER), "");
        assert!(!record.contains(fields::PHONE_NUMBER));
    }

    #[test]
    fn records_decode_in_array_order() {
        let json = r#"[
            {"recipientName": "Ana Lopez", "time": "9:00 AM"},
            {"recipientName": "Carla Diaz", "time": "10:30 AM"}
        ]"#;
        let records = Record::list_from_json(json).expect("records should decode");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(fields::RECIPIENT_NAME), "Ana Lopez");
        assert_eq!(records[1].get(fields::TIME), "10:30 AM");

        let encoded = Record::list_to_json(&records).expect("records should encode");
        assert_eq!(Record::list_from_json(&encoded).unwrap(), records);
    }

    #[test]
    fn non_string_values_are_rejected() {
        assert!(Record::list_from_json(r#"[{"time": 9}]"#).is_err());
    }

    #[test]
    fn shaping_rules_match_import() {
        assert_eq!(treatment_name("IUI - 100 USD"), "IUI");
        assert_eq!(treatment_name("Consulta"), "Consulta");
        assert_eq!(treatment_name(""), "");
        assert_eq!(visit_number("Visit 3"), " 3");
        assert_eq!(strip_currency("IVF - 500 USD"), "IVF - 500 ");

        let record = shape_record(&BookingAnswers {
            time: "9:00 AM",
            recipient_first_name: "Ana",
            recipient_blood_type: "O+",
            donor_name: "Beto Ruiz",
            donor_blood_type: "A-",
            doctor_name: "Dra. Mendez",
            phone_number: "555-0101",
            treatment_required: "IUI - 100 USD",
            visit: "Visit 1",
            ..BookingAnswers::default()
        });
        assert_eq!(record.get(fields::RECIPIENT_NAME), "Ana");
        assert_eq!(record.get(fields::TREATMENT_NAME), "IUI");
        assert_eq!(record.get(fields::TREATMENT_REQUIRED), "IUI - 100 ");
        assert_eq!(record.get(fields::VISIT_NUMBER), " 1");
        assert_eq!(record.get(fields::RECIPIENT_BLOOD_TYPE), "O+");
        assert_eq!(record.get(fields::DONOR_BLOOD_TYPE), "A-");
        assert_eq!(record.get(fields::DOCTOR_NAME), "Dra. Mendez");
    }

    #[test]
    fn unanswered_booking_fields_shape_to_empty_strings() {
        let record = shape_record(&BookingAnswers::default());
        assert_eq!(record.get(fields::RECIPIENT_NAME), "");
        assert_eq!(record.get(fields::TREATMENT_NAME), "");
        assert!(record.contains(fields::DOCTOR_NAME));
        assert_eq!(record.get(fields::DOCTOR_NAME), "");
    }

    #[test]
    fn table_defs_are_well_formed() {
        for table in table_defs_v1() {
            assert!(!table.columns.is_empty(), "{} has no columns", table.title);
            assert!(table.columns.iter().all(|c| c.width > 0.0));
        }
        let patients: f32 = PATIENT_COLUMNS.iter().map(|c| c.width).sum();
        assert_eq!(patients, 773.0);
        assert_eq!(table_def(TableKind::Laboratory).header_height, 30.0);
    }

    #[test]
    fn schema_fingerprint_is_stable() {
        let a = schema_fingerprint_sha256();
        let b = schema_fingerprint_sha256();
        assert_eq!(a, b);
        assert_eq!(a, hex_sha256(schema_json().to_string().as_bytes()));
        assert_eq!(a.len(), 64);
    }
}
