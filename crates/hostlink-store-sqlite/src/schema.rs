//! SQL schema for the Hostlink SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Canonical catalog. Read-only on the identification path.
-- The *_fold columns hold Unicode-lowercased copies for lookup.
CREATE TABLE IF NOT EXISTS taxonomy (
    taxon_id        TEXT PRIMARY KEY,
    kind            TEXT NOT NULL,   -- 'subject' | 'host'
    division        TEXT NOT NULL,
    family          TEXT,
    genus           TEXT,
    species         TEXT,
    scientific_name TEXT,
    common_name     TEXT,
    scientific_fold TEXT,
    common_fold     TEXT,
    genus_fold      TEXT,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS observations (
    observation_id         TEXT PRIMARY KEY,
    owner_id               TEXT NOT NULL,
    subject_taxon_id       TEXT REFERENCES taxonomy(taxon_id),
    host_taxon_id          TEXT REFERENCES taxonomy(taxon_id),
    subject_identification TEXT NOT NULL DEFAULT '',
    host_identification    TEXT NOT NULL DEFAULT '',
    notes                  TEXT,
    created_at             TEXT NOT NULL,
    updated_at             TEXT NOT NULL
);

-- is_verified only ever moves 0 -> 1.
CREATE TABLE IF NOT EXISTS identifications (
    identification_id TEXT PRIMARY KEY,
    observation_id    TEXT NOT NULL REFERENCES observations(observation_id) ON DELETE CASCADE,
    author_id         TEXT NOT NULL,
    species_text      TEXT NOT NULL,
    scientific_name   TEXT,
    kind              TEXT NOT NULL,   -- 'subject' | 'host'
    is_verified       INTEGER NOT NULL DEFAULT 0,
    verified_at       TEXT,
    verified_by       TEXT,
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS identification_votes (
    identification_id TEXT NOT NULL REFERENCES identifications(identification_id) ON DELETE CASCADE,
    voter_id          TEXT NOT NULL,
    created_at        TEXT NOT NULL,
    PRIMARY KEY (identification_id, voter_id)
);

-- Counters are only changed by in-place increments/decrements.
CREATE TABLE IF NOT EXISTS relationships (
    relationship_id   TEXT PRIMARY KEY,
    subject_taxon_id  TEXT NOT NULL,
    host_taxon_id     TEXT NOT NULL,
    observation_count INTEGER NOT NULL DEFAULT 0 CHECK (observation_count >= 0),
    verified_count    INTEGER NOT NULL DEFAULT 0 CHECK (verified_count >= 0),
    tier              TEXT NOT NULL,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    UNIQUE (subject_taxon_id, host_taxon_id)
);

-- At most one link per observation. verified_contribution is what the link
-- added to verified_count, so a relink can take back exactly that much.
CREATE TABLE IF NOT EXISTS relationship_links (
    observation_id        TEXT PRIMARY KEY REFERENCES observations(observation_id) ON DELETE CASCADE,
    relationship_id       TEXT NOT NULL REFERENCES relationships(relationship_id) ON DELETE CASCADE,
    verified_contribution INTEGER NOT NULL DEFAULT 0,
    linked_at             TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS taxonomy_kind_idx             ON taxonomy(kind);
CREATE INDEX IF NOT EXISTS observations_owner_idx        ON observations(owner_id);
CREATE INDEX IF NOT EXISTS identifications_obs_idx       ON identifications(observation_id);
CREATE INDEX IF NOT EXISTS relationship_links_rel_idx    ON relationship_links(relationship_id);

PRAGMA user_version = 2;
";
