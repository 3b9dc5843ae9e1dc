//! CSV export of stored records: header `Key,Data`, one row per record, with
//! `Data` the stored JSON. Works over any ledger or notary store.

use std::io;

use veil_core::Family;
use veil_store::{family_prefix, record_id_in_family, split_record_key, KvStore, KvStoreExt};

use crate::error::LedgerError;

/// Write every record of `family` (all families when `None`) to `writer`.
/// Returns the number of rows written, excluding the header.
pub fn export_csv<W: io::Write>(
    store: &dyn KvStore,
    writer: W,
    family: Option<&Family>,
) -> Result<usize, LedgerError> {
    let prefix = family.map(family_prefix).unwrap_or_default();
    let entries = store.read(|txn| txn.scan(&prefix))?;

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["Key", "Data"])?;
    let mut rows = 0;
    for (key, value) in entries {
        let belongs = match family {
            Some(f) => record_id_in_family(&key, f).is_some(),
            None => split_record_key(&key).is_some(),
        };
        if !belongs {
            continue;
        }
        let data = std::str::from_utf8(&value).map_err(|e| LedgerError::Corrupt {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        out.write_record([key.as_str(), data])?;
        rows += 1;
    }
    out.flush().map_err(|e| LedgerError::Export(e.to_string()))?;
    tracing::info!(rows, family = ?family.map(Family::as_str), "records exported");
    Ok(rows)
}
