//! End-to-end run of the repair/collapse pipeline over tempdir fixtures.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Int8Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use hes_spells::{
    Episode, ImdLookup, Spell, attach_imd, collapse_episodes, load_episode_batches, read_parquet,
    write_parquet,
};

const HEADER: &str = "PSEUDO_HESID,EPIKEY,ADMIDATE,DISDATE,ADMIMETH,DIAG_4_01,ETHNOS,SEX,LSOA11";

fn write_episode_csv(path: &Path) {
    // P1: three episodes of one stay (two share a diagnosis), emergency on
    // the second episode, known LSOA. P2: far-past discharge sentinel and
    // an LSOA missing from the lookup.
    let rows = [
        "P1,E1,2021-01-01,2021-01-05,11,X10,A,1,E01000001",
        "P1,E2,2021-01-01,2021-01-05,21,X10,A,1,E01000001",
        "P1,E3,2021-01-01,2021-01-05,11,Y20,B,1,E01000001",
        "P2,E4,2021-06-01,1800-01-01,13,Z30,C,2,E09999999",
    ];
    fs::write(path, format!("{HEADER}\n{}\n", rows.join("\n"))).unwrap();
}

fn write_lookup(path: &Path) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("lsoa11_code", DataType::Utf8, true),
        Field::new("imd_decile", DataType::Int8, true),
        Field::new("imd_quintile", DataType::Int8, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["E01000001"])),
        Arc::new(Int8Array::from(vec![6])),
        Arc::new(Int8Array::from(vec![3])),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    write_parquet(path, schema, &[batch]).unwrap();
}

fn str_col<'a>(batch: &'a RecordBatch, name: &str) -> &'a StringArray {
    batch
        .column(batch.schema().index_of(name).unwrap())
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap()
}

#[test]
fn csv_to_spell_parquet_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("extract.csv");
    let lookup_path = dir.path().join("imd.parquet");
    let out_path = dir.path().join("out").join("spells.parquet");
    write_episode_csv(&csv_path);
    write_lookup(&lookup_path);

    let batches = load_episode_batches(&csv_path, None).unwrap();
    let mut episodes = Episode::from_batches(&batches);
    assert_eq!(episodes.len(), 4);

    let lookup = ImdLookup::from_parquet(&lookup_path).unwrap();
    attach_imd(&mut episodes, &lookup);

    let spells = collapse_episodes(&episodes);
    let batch = Spell::to_record_batch(&spells).unwrap();
    write_parquet(&out_path, Arc::new(Spell::schema()), &[batch]).unwrap();

    let read_back = read_parquet(&out_path).unwrap();
    assert_eq!(read_back.len(), 1);
    let batch = &read_back[0];
    assert_eq!(batch.num_rows(), 2);

    let schema = batch.schema();
    let names: Vec<&str> = schema
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "PSEUDO_HESID",
            "adm",
            "dis",
            "n_episodes",
            "los_days",
            "any_emerg",
            "imd_quintile",
            "primary_diag",
            "ethnicity",
            "sex",
            "spell_id",
        ]
    );

    // Rows come out ordered by (patient, admission, discharge).
    let ids = str_col(batch, "PSEUDO_HESID");
    assert_eq!(ids.value(0), "P1");
    assert_eq!(ids.value(1), "P2");

    let n_episodes = batch
        .column(3)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(n_episodes.value(0), 3);
    assert_eq!(n_episodes.value(1), 1);

    let los = batch
        .column(4)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(los.value(0), 5);
    // P2's discharge was a pre-1900 sentinel: null LOS, spell retained.
    assert!(los.is_null(1));

    let any_emerg = batch
        .column(5)
        .as_any()
        .downcast_ref::<BooleanArray>()
        .unwrap();
    assert!(any_emerg.value(0));
    assert!(!any_emerg.value(1));

    let quintile = batch
        .column(6)
        .as_any()
        .downcast_ref::<Int8Array>()
        .unwrap();
    assert_eq!(quintile.value(0), 3);
    // Unmatched LSOA joins to null, the row is not dropped.
    assert!(quintile.is_null(1));

    let diag = str_col(batch, "primary_diag");
    assert_eq!(diag.value(0), "X10");
    assert_eq!(diag.value(1), "Z30");

    let spell_ids = str_col(batch, "spell_id");
    assert_eq!(spell_ids.value(0), "P1|2021-01-01|2021-01-05");
    assert_eq!(spell_ids.value(1), "P2|2021-06-01|");
}
