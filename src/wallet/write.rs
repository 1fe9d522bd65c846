//! Synthetic wallet construction.
//!
//! Builds well-formed wallet files for both backends from a [`RecordMap`]:
//! a Berkeley DB btree image with a `main` named database
//! ([`build_bdb_image`]) and a SQLite database with a `main` table
//! ([`write_sqlite_wallet`]). Also provides helpers for serializing `mkey`
//! keys and values. Used by the test suites to exercise the readers end to end.
//!
//! Berkeley DB page layout produced:
//!
//! | Page | Contents |
//! |------|----------|
//! | 0 | master metadata (`BTM_SUBDB`), root = 1 |
//! | 1 | master leaf: `"main"` -> page 2 (big-endian) |
//! | 2 | `main` metadata, root = leaf or internal page |
//! | 3.. | leaves (chained), one internal root if more than one leaf, then overflow pages |

use std::path::Path;

use rusqlite::{params, Connection};

use crate::wallet::backend::RecordMap;
use crate::wallet::bdb::Endian;
use crate::wallet::compact_size::encode;
use crate::wallet::constants::*;
use crate::WdatError;

const MASTER_META_PGNO: u32 = 0;
const MASTER_LEAF_PGNO: u32 = 1;
const MAIN_META_PGNO: u32 = 2;
const FIRST_LEAF_PGNO: u32 = 3;
const BTREE_VERSION: u32 = 9;
const INTERNAL_LEVEL: u8 = 2;

/// Serialize bytes with a CompactSize length prefix.
pub fn var_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = encode(data.len() as u64);
    out.extend_from_slice(data);
    out
}

/// Build a record key: CompactSize-prefixed `tag` followed by `suffix`.
pub fn tagged_key(tag: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut key = var_bytes(tag);
    key.extend_from_slice(suffix);
    key
}

/// Build an `mkey` record key for master key `id`.
pub fn mkey_key(id: u32) -> Vec<u8> {
    tagged_key(MKEY_TAG, &id.to_le_bytes())
}

/// Serialize an `mkey` value. `derivation` is the optional
/// `(method, iterations)` trailer.
pub fn mkey_value(encrypted_key: &[u8], salt: &[u8], derivation: Option<(u32, u32)>) -> Vec<u8> {
    let mut value = var_bytes(encrypted_key);
    value.extend_from_slice(&var_bytes(salt));
    if let Some((method, iterations)) = derivation {
        value.extend_from_slice(&method.to_le_bytes());
        value.extend_from_slice(&iterations.to_le_bytes());
        // Empty other-derivation-parameters field
        value.extend_from_slice(&var_bytes(&[]));
    }
    value
}

/// Page geometry of a synthetic Berkeley DB image.
#[derive(Debug, Clone)]
pub struct BdbLayout {
    pub page_size: u32,
    pub big_endian: bool,
}

impl Default for BdbLayout {
    fn default() -> Self {
        BdbLayout {
            page_size: 4096,
            big_endian: false,
        }
    }
}

/// A leaf item before page numbers are assigned.
enum Item<'a> {
    Inline(&'a [u8]),
    Overflow(&'a [u8]),
}

impl Item<'_> {
    fn size(&self) -> usize {
        match self {
            Item::Inline(data) => align4(BKEYDATA_DATA + data.len()),
            Item::Overflow(_) => SIZE_BOVERFLOW,
        }
    }
}

fn classify(data: &[u8], overflow_threshold: usize) -> Item<'_> {
    if data.len() > overflow_threshold {
        Item::Overflow(data)
    } else {
        Item::Inline(data)
    }
}

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

struct PageWriter {
    buf: Vec<u8>,
    endian: Endian,
    hf: usize,
    entries: u16,
}

impl PageWriter {
    fn new(page_size: usize, endian: Endian, pgno: u32, page_type: u8, level: u8) -> Self {
        let mut buf = vec![0u8; page_size];
        endian.write_u32(&mut buf[PAGE_PGNO..], pgno);
        buf[PAGE_LEVEL] = level;
        buf[PAGE_TYPE] = page_type;
        PageWriter {
            buf,
            endian,
            hf: page_size,
            entries: 0,
        }
    }

    fn link(&mut self, prev: u32, next: u32) {
        self.endian.write_u32(&mut self.buf[PAGE_PREV_PGNO..], prev);
        self.endian.write_u32(&mut self.buf[PAGE_NEXT_PGNO..], next);
    }

    /// Place an item below the previous one and append its index slot.
    fn push(&mut self, item: &[u8]) {
        self.hf -= align4(item.len());
        self.buf[self.hf..self.hf + item.len()].copy_from_slice(item);
        let slot = SIZE_PAGE_HEADER + self.entries as usize * 2;
        self.endian.write_u16(&mut self.buf[slot..], self.hf as u16);
        self.entries += 1;
    }

    fn finish(mut self) -> Vec<u8> {
        self.endian.write_u16(&mut self.buf[PAGE_ENTRIES..], self.entries);
        self.endian.write_u16(&mut self.buf[PAGE_HF_OFFSET..], self.hf as u16);
        self.buf
    }
}

fn bkeydata(endian: Endian, data: &[u8]) -> Vec<u8> {
    let mut item = vec![0u8; BKEYDATA_DATA + data.len()];
    endian.write_u16(&mut item[BKEYDATA_LEN..], data.len() as u16);
    item[BKEYDATA_TYPE] = B_KEYDATA;
    item[BKEYDATA_DATA..].copy_from_slice(data);
    item
}

fn boverflow(endian: Endian, pgno: u32, total: usize) -> Vec<u8> {
    let mut item = vec![0u8; SIZE_BOVERFLOW];
    item[BKEYDATA_TYPE] = B_OVERFLOW;
    endian.write_u32(&mut item[BOVERFLOW_PGNO..], pgno);
    endian.write_u32(&mut item[BOVERFLOW_TLEN..], total as u32);
    item
}

fn binternal(endian: Endian, child: u32, key: &[u8]) -> Vec<u8> {
    let mut item = vec![0u8; BINTERNAL_DATA + key.len()];
    endian.write_u16(&mut item[BINTERNAL_LEN..], key.len() as u16);
    item[BINTERNAL_TYPE] = B_KEYDATA;
    endian.write_u32(&mut item[BINTERNAL_PGNO..], child);
    endian.write_u32(&mut item[BINTERNAL_NRECS..], 0);
    item[BINTERNAL_DATA..].copy_from_slice(key);
    item
}

fn meta_page(layout: &BdbLayout, endian: Endian, pgno: u32, last_pgno: u32, flags: u32, root: u32) -> Vec<u8> {
    let mut page = vec![0u8; layout.page_size as usize];
    endian.write_u32(&mut page[DBMETA_PGNO..], pgno);
    endian.write_u32(&mut page[DBMETA_MAGIC..], BTREE_MAGIC);
    endian.write_u32(&mut page[DBMETA_VERSION..], BTREE_VERSION);
    endian.write_u32(&mut page[DBMETA_PAGESIZE..], layout.page_size);
    page[DBMETA_TYPE] = P_BTREEMETA;
    endian.write_u32(&mut page[DBMETA_FREE..], PGNO_INVALID);
    endian.write_u32(&mut page[DBMETA_LAST_PGNO..], last_pgno);
    endian.write_u32(&mut page[DBMETA_FLAGS..], flags);
    endian.write_u32(&mut page[BTMETA_ROOT..], root);
    page
}

/// Build a Berkeley DB image whose `main` database holds `records`.
///
/// Items longer than a quarter page are written to overflow pages. Up to one
/// internal level is supported; a record set needing more is rejected.
pub fn build_bdb_image(records: &RecordMap, layout: &BdbLayout) -> Result<Vec<u8>, WdatError> {
    let page_size = layout.page_size as usize;
    if !layout.page_size.is_power_of_two()
        || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&layout.page_size)
    {
        return Err(WdatError::Argument(format!("invalid page size {}", layout.page_size)));
    }
    let endian = if layout.big_endian { Endian::Big } else { Endian::Little };
    let overflow_threshold = page_size / 4;
    let overflow_capacity = page_size - SIZE_PAGE_HEADER;

    // Pack key/data pairs into leaves
    let mut leaves: Vec<Vec<(Item, Item)>> = vec![Vec::new()];
    let mut used = SIZE_PAGE_HEADER;
    for (key, value) in records {
        let pair = (
            classify(key, overflow_threshold),
            classify(value, overflow_threshold),
        );
        let need = pair.0.size() + pair.1.size() + 4;
        if used + need > page_size && leaves.last().is_some_and(|leaf| !leaf.is_empty()) {
            leaves.push(Vec::new());
            used = SIZE_PAGE_HEADER;
        }
        used += need;
        if let Some(leaf) = leaves.last_mut() {
            leaf.push(pair);
        }
    }

    let leaf_count = leaves.len() as u32;
    let root = if leaf_count > 1 {
        FIRST_LEAF_PGNO + leaf_count
    } else {
        FIRST_LEAF_PGNO
    };
    let mut next_overflow = root + 1;
    let mut overflow_pages: Vec<Vec<u8>> = Vec::new();

    let mut place_overflow = |data: &[u8]| -> u32 {
        let first = next_overflow;
        let chunks: Vec<&[u8]> = data.chunks(overflow_capacity).collect();
        for (i, chunk) in chunks.iter().enumerate() {
            let pgno = next_overflow;
            let mut page = PageWriter::new(page_size, endian, pgno, P_OVERFLOW, 0);
            let prev = if i == 0 { PGNO_INVALID } else { pgno - 1 };
            let next = if i + 1 == chunks.len() { PGNO_INVALID } else { pgno + 1 };
            page.link(prev, next);
            page.buf[SIZE_PAGE_HEADER..SIZE_PAGE_HEADER + chunk.len()].copy_from_slice(chunk);
            let mut buf = page.finish();
            endian.write_u16(&mut buf[PAGE_HF_OFFSET..], chunk.len() as u16);
            overflow_pages.push(buf);
            next_overflow += 1;
        }
        first
    };

    let mut leaf_pages = Vec::with_capacity(leaves.len());
    for (i, leaf) in leaves.iter().enumerate() {
        let pgno = FIRST_LEAF_PGNO + i as u32;
        let mut page = PageWriter::new(page_size, endian, pgno, P_LBTREE, LEAF_LEVEL);
        let prev = if i == 0 { PGNO_INVALID } else { pgno - 1 };
        let next = if i + 1 == leaves.len() { PGNO_INVALID } else { pgno + 1 };
        page.link(prev, next);
        for (key, value) in leaf {
            for item in [key, value] {
                let bytes = match *item {
                    Item::Inline(data) => bkeydata(endian, data),
                    Item::Overflow(data) => boverflow(endian, place_overflow(data), data.len()),
                };
                page.push(&bytes);
            }
        }
        leaf_pages.push(page.finish());
    }

    let mut internal_page = None;
    if leaf_count > 1 {
        let mut page = PageWriter::new(page_size, endian, root, P_IBTREE, INTERNAL_LEVEL);
        let mut used = SIZE_PAGE_HEADER;
        for (i, leaf) in leaves.iter().enumerate() {
            // Separator keys are informational; the first child takes an empty key.
            let separator: &[u8] = match (i, leaf.first()) {
                (0, _) | (_, None) => &[],
                (_, Some((Item::Inline(key), _))) => *key,
                (_, Some((Item::Overflow(_), _))) => &[],
            };
            let item = binternal(endian, FIRST_LEAF_PGNO + i as u32, separator);
            used += align4(item.len()) + 2;
            if used > page_size {
                return Err(WdatError::Argument(format!(
                    "{} leaves do not fit under a single internal page",
                    leaf_count
                )));
            }
            page.push(&item);
        }
        internal_page = Some(page.finish());
    }

    let last_pgno = next_overflow - 1;

    let mut master_leaf = PageWriter::new(page_size, endian, MASTER_LEAF_PGNO, P_LBTREE, LEAF_LEVEL);
    master_leaf.push(&bkeydata(endian, MAIN_DATABASE.as_bytes()));
    master_leaf.push(&bkeydata(endian, &MAIN_META_PGNO.to_be_bytes()));

    let mut image = Vec::with_capacity((last_pgno as usize + 1) * page_size);
    image.extend(meta_page(layout, endian, MASTER_META_PGNO, last_pgno, BTM_SUBDB, MASTER_LEAF_PGNO));
    image.extend(master_leaf.finish());
    image.extend(meta_page(layout, endian, MAIN_META_PGNO, last_pgno, 0, root));
    for page in leaf_pages {
        image.extend(page);
    }
    if let Some(page) = internal_page {
        image.extend(page);
    }
    for page in overflow_pages {
        image.extend(page);
    }
    Ok(image)
}

/// Write a Berkeley DB wallet holding `records` to `path`.
pub fn write_bdb_wallet<P: AsRef<Path>>(
    path: P,
    records: &RecordMap,
    layout: &BdbLayout,
) -> Result<(), WdatError> {
    let path = path.as_ref();
    let image = build_bdb_image(records, layout)?;
    std::fs::write(path, image)
        .map_err(|e| WdatError::Io(format!("Cannot write {}: {}", path.display(), e)))
}

/// Create a SQLite wallet at `path` with `records` in its `main` table.
pub fn write_sqlite_wallet<P: AsRef<Path>>(path: P, records: &RecordMap) -> Result<(), WdatError> {
    let path = path.as_ref();
    let map_err = |e: rusqlite::Error| WdatError::Io(format!("Cannot write {}: {}", path.display(), e));

    let mut conn = Connection::open(path).map_err(map_err)?;
    let tx = conn.transaction().map_err(map_err)?;
    tx.execute_batch("CREATE TABLE main(key BLOB PRIMARY KEY NOT NULL, value BLOB NOT NULL);")
        .map_err(map_err)?;
    for (key, value) in records {
        tx.execute("INSERT INTO main (key, value) VALUES (?1, ?2)", params![key, value])
            .map_err(map_err)?;
    }
    tx.commit().map_err(map_err)
}
