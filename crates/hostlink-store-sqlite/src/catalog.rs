//! [`TaxonomyCatalog`] for [`SqliteStore`].

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use hostlink_core::{
  store::TaxonomyCatalog,
  taxonomy::{NewTaxon, TaxonKind, TaxonomyEntry},
};

use crate::{
  Result, SqliteStore,
  encode::{
    RawTaxon, TAXON_COLUMNS, decode_uuid, encode_dt, encode_kind, encode_uuid, fold, like_pattern,
  },
};

impl TaxonomyCatalog for SqliteStore {
  async fn find_taxonomy(&self, text: String, kind: TaxonKind) -> Result<Option<Uuid>> {
    let pattern  = like_pattern(&fold(&text));
    let kind_str = encode_kind(kind);

    let found: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            r"SELECT taxon_id FROM taxonomy
              WHERE kind = ?1
                AND (scientific_fold LIKE ?2 ESCAPE '\'
                  OR common_fold     LIKE ?2 ESCAPE '\'
                  OR genus_fold      LIKE ?2 ESCAPE '\')
              ORDER BY rowid
              LIMIT 1",
            rusqlite::params![kind_str, pattern],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    found.as_deref().map(decode_uuid).transpose()
  }

  async fn get_taxon(&self, id: Uuid) -> Result<Option<TaxonomyEntry>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTaxon> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {TAXON_COLUMNS} FROM taxonomy WHERE taxon_id = ?1"),
            rusqlite::params![id_str],
            RawTaxon::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawTaxon::into_taxon).transpose()
  }

  async fn add_taxon(&self, input: NewTaxon) -> Result<TaxonomyEntry> {
    let entry = TaxonomyEntry {
      taxon_id:        Uuid::new_v4(),
      kind:            input.kind,
      division:        input.division,
      family:          input.family,
      genus:           input.genus,
      species:         input.species,
      scientific_name: input.scientific_name,
      common_name:     input.common_name,
      created_at:      Utc::now(),
    };

    let id_str     = encode_uuid(entry.taxon_id);
    let kind_str   = encode_kind(entry.kind);
    let division   = entry.division.clone();
    let family     = entry.family.clone();
    let genus      = entry.genus.clone();
    let species    = entry.species.clone();
    let scientific = entry.scientific_name.clone();
    let common     = entry.common_name.clone();
    let folds      = [&scientific, &common, &genus].map(|v| v.as_deref().map(fold));
    let at_str     = encode_dt(entry.created_at);

    self
      .conn
      .call(move |conn| {
        let [scientific_fold, common_fold, genus_fold] = folds;
        conn.execute(
          "INSERT INTO taxonomy (
             taxon_id, kind, division, family, genus, species,
             scientific_name, common_name,
             scientific_fold, common_fold, genus_fold, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            id_str, kind_str, division, family, genus, species, scientific, common,
            scientific_fold, common_fold, genus_fold, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(entry)
  }
}
