//! Berkeley DB btree reader.
//!
//! Legacy `wallet.dat` files are Berkeley DB files holding several named
//! databases. Page 0 is the btree metadata page of the *master* database
//! ([`BtreeMeta`]), whose leaf entries map database names to the page number
//! of each named database's own metadata page. Wallet records live in the
//! database named `main`.
//!
//! Every other page starts with a 26-byte header ([`PageHeader`]) followed by
//! an array of 16-bit item offsets. Leaf pages hold alternating key/data
//! items; internal pages hold child pointers; overflow pages hold chained
//! fragments of items too large for a leaf.
//!
//! The reader never writes to the file and never attempts recovery. Any
//! structural problem (bad magic, unsupported features, out-of-range pages,
//! cycles, truncated items) is reported as [`WdatError::NotThisFormat`] so the
//! caller can try another backend. Only a failure to read the file itself is
//! reported as [`WdatError::Io`].

use std::collections::HashSet;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, warn};
use serde::Serialize;

use crate::wallet::backend::RecordMap;
use crate::wallet::constants::*;
use crate::WdatError;

/// Byte order of a Berkeley DB file, as revealed by its metadata magic.
///
/// Berkeley DB writes pages in the byte order of the host that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(buf),
            Endian::Big => BigEndian::read_u16(buf),
        }
    }

    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(buf),
            Endian::Big => BigEndian::read_u32(buf),
        }
    }

    pub fn write_u16(self, buf: &mut [u8], n: u16) {
        match self {
            Endian::Little => LittleEndian::write_u16(buf, n),
            Endian::Big => BigEndian::write_u16(buf, n),
        }
    }

    pub fn write_u32(self, buf: &mut [u8], n: u32) {
        match self {
            Endian::Little => LittleEndian::write_u32(buf, n),
            Endian::Big => BigEndian::write_u32(buf, n),
        }
    }
}

fn not_bdb(msg: impl Into<String>) -> WdatError {
    WdatError::NotThisFormat(msg.into())
}

/// Parsed btree metadata page (page 0, and the first page of each named database).
#[derive(Debug, Clone, Serialize)]
pub struct BtreeMeta {
    /// Byte order of the file.
    pub endian: Endian,
    /// Btree format version.
    pub version: u32,
    /// Page size in bytes.
    pub page_size: u32,
    /// Encryption algorithm (0 = none).
    pub encrypt_alg: u8,
    /// Meta flags (bit 0 = page checksums).
    pub meta_flags: u8,
    /// Last page number in use.
    pub last_pgno: u32,
    /// Database flags (`BTM_SUBDB` = named databases present).
    pub flags: u32,
    /// Root page of the btree.
    pub root: u32,
}

impl BtreeMeta {
    /// Parse and validate a btree metadata page.
    ///
    /// The byte order is detected from the magic number. Encrypted files,
    /// checksummed pages, and unknown versions or page sizes are rejected.
    pub fn parse(page: &[u8]) -> Result<Self, WdatError> {
        if page.len() < SIZE_BTREE_META {
            return Err(not_bdb(format!(
                "{} bytes is too small for a btree metadata page",
                page.len()
            )));
        }

        let magic = &page[DBMETA_MAGIC..];
        let endian = if LittleEndian::read_u32(magic) == BTREE_MAGIC {
            Endian::Little
        } else if BigEndian::read_u32(magic) == BTREE_MAGIC {
            Endian::Big
        } else {
            return Err(not_bdb(format!(
                "bad btree magic 0x{:08x}",
                LittleEndian::read_u32(magic)
            )));
        };

        let meta = BtreeMeta {
            endian,
            version: endian.read_u32(&page[DBMETA_VERSION..]),
            page_size: endian.read_u32(&page[DBMETA_PAGESIZE..]),
            encrypt_alg: page[DBMETA_ENCRYPT_ALG],
            meta_flags: page[DBMETA_METAFLAGS],
            last_pgno: endian.read_u32(&page[DBMETA_LAST_PGNO..]),
            flags: endian.read_u32(&page[DBMETA_FLAGS..]),
            root: endian.read_u32(&page[BTMETA_ROOT..]),
        };

        if page[DBMETA_TYPE] != P_BTREEMETA {
            return Err(not_bdb(format!(
                "metadata page type {} is not a btree",
                page[DBMETA_TYPE]
            )));
        }
        if !(BTREE_VERSION_MIN..=BTREE_VERSION_MAX).contains(&meta.version) {
            return Err(not_bdb(format!("unsupported btree version {}", meta.version)));
        }
        if !meta.page_size.is_power_of_two()
            || !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&meta.page_size)
        {
            return Err(not_bdb(format!("invalid page size {}", meta.page_size)));
        }
        if meta.encrypt_alg != 0 {
            return Err(not_bdb("encrypted Berkeley DB files are not supported"));
        }
        if meta.meta_flags & DBMETA_CHKSUM != 0 {
            return Err(not_bdb("checksummed Berkeley DB pages are not supported"));
        }

        Ok(meta)
    }

    /// Returns true if the file holds named databases.
    pub fn has_subdatabases(&self) -> bool {
        self.flags & BTM_SUBDB != 0
    }
}

/// Parsed generic page header (26 bytes).
#[derive(Debug, Clone, Serialize)]
pub struct PageHeader {
    /// Page number. Bytes 8-11.
    pub pgno: u32,
    /// Previous page at the same btree level. Bytes 12-15.
    pub prev_pgno: u32,
    /// Next page at the same level, or next overflow page. Bytes 16-19.
    pub next_pgno: u32,
    /// Number of item indexes. Bytes 20-21.
    pub entries: u16,
    /// High free offset; on overflow pages, the bytes of data held. Bytes 22-23.
    pub hf_offset: u16,
    /// Btree level (1 = leaf). Byte 24.
    pub level: u8,
    /// Page type. Byte 25.
    pub page_type: u8,
}

impl PageHeader {
    /// Parse a page header. The slice must be at least 26 bytes.
    pub fn parse(page: &[u8], endian: Endian) -> Option<Self> {
        if page.len() < SIZE_PAGE_HEADER {
            return None;
        }

        Some(PageHeader {
            pgno: endian.read_u32(&page[PAGE_PGNO..]),
            prev_pgno: endian.read_u32(&page[PAGE_PREV_PGNO..]),
            next_pgno: endian.read_u32(&page[PAGE_NEXT_PGNO..]),
            entries: endian.read_u16(&page[PAGE_ENTRIES..]),
            hf_offset: endian.read_u16(&page[PAGE_HF_OFFSET..]),
            level: page[PAGE_LEVEL],
            page_type: page[PAGE_TYPE],
        })
    }
}

/// An in-memory Berkeley DB file.
pub struct BdbFile {
    data: Vec<u8>,
    meta: BtreeMeta,
}

impl BdbFile {
    /// Read a Berkeley DB file from disk and validate its metadata page.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WdatError> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| WdatError::Io(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_bytes(data)
    }

    /// Wrap an in-memory file image.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, WdatError> {
        let meta = BtreeMeta::parse(&data)?;
        if data.len() < meta.page_size as usize {
            return Err(not_bdb(format!(
                "file is {} bytes, smaller than one {}-byte page",
                data.len(),
                meta.page_size
            )));
        }
        debug!(
            "Berkeley DB metadata: version {}, page size {}, {:?} endian, {} pages",
            meta.version,
            meta.page_size,
            meta.endian,
            data.len() / meta.page_size as usize
        );
        Ok(BdbFile { data, meta })
    }

    /// Metadata of the master database (page 0).
    pub fn meta(&self) -> &BtreeMeta {
        &self.meta
    }

    /// Number of whole pages in the file.
    pub fn page_count(&self) -> u32 {
        (self.data.len() / self.meta.page_size as usize) as u32
    }

    fn page(&self, pgno: u32) -> Result<&[u8], WdatError> {
        let size = self.meta.page_size as usize;
        let start = pgno as usize * size;
        self.data
            .get(start..start + size)
            .ok_or_else(|| not_bdb(format!("page {} is beyond end of file", pgno)))
    }

    fn header(&self, pgno: u32, page: &[u8]) -> Result<PageHeader, WdatError> {
        PageHeader::parse(page, self.meta.endian)
            .ok_or_else(|| not_bdb(format!("page {} has no header", pgno)))
    }

    /// Offset of item `index` on a page, read from the item index array.
    fn item_offset(&self, page: &[u8], pgno: u32, index: usize) -> Result<usize, WdatError> {
        let slot = SIZE_PAGE_HEADER + index * 2;
        if slot + 2 > page.len() {
            return Err(not_bdb(format!("page {} item index {} overruns page", pgno, index)));
        }
        Ok(self.meta.endian.read_u16(&page[slot..]) as usize)
    }

    /// Look up the root page of a named database in the master database.
    pub fn database_root(&self, name: &str) -> Result<u32, WdatError> {
        if !self.meta.has_subdatabases() {
            return Err(not_bdb("file holds no named databases"));
        }

        let entries = self.scan(self.meta.root)?;
        let (_, data) = entries
            .iter()
            .find(|(key, _)| key.as_slice() == name.as_bytes())
            .ok_or_else(|| not_bdb(format!("no database named {:?}", name)))?;
        if data.len() != 4 {
            return Err(not_bdb(format!(
                "database {:?} entry is {} bytes, expected a 4-byte page number",
                name,
                data.len()
            )));
        }

        // Named database page numbers are stored in network byte order.
        let meta_pgno = BigEndian::read_u32(data);
        let meta = BtreeMeta::parse(self.page(meta_pgno)?)?;
        if meta.endian != self.meta.endian || meta.page_size != self.meta.page_size {
            return Err(not_bdb(format!(
                "database {:?} metadata on page {} disagrees with page 0",
                name, meta_pgno
            )));
        }
        debug!("database {:?}: meta page {}, root page {}", name, meta_pgno, meta.root);
        Ok(meta.root)
    }

    /// Read every key/data pair of a named database into a [`RecordMap`].
    pub fn read_database(&self, name: &str) -> Result<RecordMap, WdatError> {
        let root = self.database_root(name)?;
        let records: RecordMap = self.scan(root)?.into_iter().collect();
        debug!("read {} records from database {:?}", records.len(), name);
        Ok(records)
    }

    /// Walk a btree from its leftmost leaf to its last leaf, in key order.
    pub fn scan(&self, root: u32) -> Result<Vec<(Vec<u8>, Vec<u8>)>, WdatError> {
        let mut visited = HashSet::new();
        let mut pgno = self.leftmost_leaf(root, &mut visited)?;
        let mut out = Vec::new();

        loop {
            let page = self.page(pgno)?;
            let header = self.header(pgno, page)?;
            if header.page_type != P_LBTREE {
                return Err(not_bdb(format!(
                    "page {} has type {}, expected a btree leaf",
                    pgno, header.page_type
                )));
            }
            self.collect_leaf(page, &header, &mut out)?;

            if header.next_pgno == PGNO_INVALID {
                break;
            }
            pgno = header.next_pgno;
            if !visited.insert(pgno) {
                return Err(not_bdb(format!("leaf chain loops back to page {}", pgno)));
            }
        }

        Ok(out)
    }

    /// Descend through the first child of each internal page to the leftmost leaf.
    fn leftmost_leaf(&self, root: u32, visited: &mut HashSet<u32>) -> Result<u32, WdatError> {
        let mut pgno = root;
        loop {
            if !visited.insert(pgno) {
                return Err(not_bdb(format!("btree descent loops back to page {}", pgno)));
            }
            let page = self.page(pgno)?;
            let header = self.header(pgno, page)?;
            match header.page_type {
                P_LBTREE => return Ok(pgno),
                P_IBTREE => {
                    if header.entries == 0 {
                        return Err(not_bdb(format!("internal page {} is empty", pgno)));
                    }
                    let off = self.item_offset(page, pgno, 0)?;
                    if off + BINTERNAL_DATA > page.len() {
                        return Err(not_bdb(format!("internal item on page {} overruns page", pgno)));
                    }
                    pgno = self.meta.endian.read_u32(&page[off + BINTERNAL_PGNO..]);
                }
                other => {
                    return Err(not_bdb(format!(
                        "page {} has type {}, expected a btree page",
                        pgno, other
                    )))
                }
            }
        }
    }

    fn collect_leaf(
        &self,
        page: &[u8],
        header: &PageHeader,
        out: &mut Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<(), WdatError> {
        let entries = header.entries as usize;
        if entries % 2 != 0 {
            return Err(not_bdb(format!(
                "leaf page {} has an odd number of items ({})",
                header.pgno, entries
            )));
        }

        for index in (0..entries).step_by(2) {
            let key = self.leaf_item(page, header.pgno, index)?;
            let data = self.leaf_item(page, header.pgno, index + 1)?;
            if let (Some(key), Some(data)) = (key, data) {
                out.push((key, data));
            }
        }
        Ok(())
    }

    /// Read one leaf item. Returns `None` for deleted items and off-page duplicates.
    fn leaf_item(&self, page: &[u8], pgno: u32, index: usize) -> Result<Option<Vec<u8>>, WdatError> {
        let off = self.item_offset(page, pgno, index)?;
        if off < SIZE_PAGE_HEADER || off + BKEYDATA_DATA > page.len() {
            return Err(not_bdb(format!(
                "item {} on page {} has bad offset {}",
                index, pgno, off
            )));
        }

        let item_type = page[off + BKEYDATA_TYPE];
        if item_type & B_DELETE != 0 {
            warn!("skipping deleted item {} on page {}", index, pgno);
            return Ok(None);
        }

        match item_type & !B_DELETE {
            B_KEYDATA => {
                let len = self.meta.endian.read_u16(&page[off + BKEYDATA_LEN..]) as usize;
                let start = off + BKEYDATA_DATA;
                page.get(start..start + len)
                    .map(|bytes| Some(bytes.to_vec()))
                    .ok_or_else(|| {
                        not_bdb(format!("item {} on page {} overruns page", index, pgno))
                    })
            }
            B_OVERFLOW => {
                if off + SIZE_BOVERFLOW > page.len() {
                    return Err(not_bdb(format!(
                        "overflow item {} on page {} overruns page",
                        index, pgno
                    )));
                }
                let first = self.meta.endian.read_u32(&page[off + BOVERFLOW_PGNO..]);
                let total = self.meta.endian.read_u32(&page[off + BOVERFLOW_TLEN..]);
                self.read_overflow(first, total).map(Some)
            }
            B_DUPLICATE => {
                warn!("skipping off-page duplicate set on page {}", pgno);
                Ok(None)
            }
            other => Err(not_bdb(format!(
                "item {} on page {} has unknown type {}",
                index, pgno, other
            ))),
        }
    }

    /// Reassemble an item stored in a chain of overflow pages.
    fn read_overflow(&self, first: u32, total: u32) -> Result<Vec<u8>, WdatError> {
        let total = total as usize;
        if total > self.data.len() {
            return Err(not_bdb(format!(
                "overflow item of {} bytes is larger than the file",
                total
            )));
        }

        let mut out = Vec::with_capacity(total);
        let mut seen = HashSet::new();
        let mut pgno = first;
        while pgno != PGNO_INVALID && out.len() < total {
            if !seen.insert(pgno) {
                return Err(not_bdb(format!("overflow chain loops back to page {}", pgno)));
            }
            let page = self.page(pgno)?;
            let header = self.header(pgno, page)?;
            if header.page_type != P_OVERFLOW {
                return Err(not_bdb(format!(
                    "page {} has type {}, expected an overflow page",
                    pgno, header.page_type
                )));
            }
            let len = header.hf_offset as usize;
            let chunk = page
                .get(SIZE_PAGE_HEADER..SIZE_PAGE_HEADER + len)
                .ok_or_else(|| not_bdb(format!("overflow page {} overruns page", pgno)))?;
            out.extend_from_slice(chunk);
            pgno = header.next_pgno;
        }

        if out.len() != total {
            return Err(not_bdb(format!(
                "overflow chain starting at page {} holds {} bytes, expected {}",
                first,
                out.len(),
                total
            )));
        }
        Ok(out)
    }
}

/// Read all records of the `main` database of a Berkeley DB wallet.
pub fn read<P: AsRef<Path>>(path: P) -> Result<RecordMap, WdatError> {
    BdbFile::open(path)?.read_database(MAIN_DATABASE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::write::{build_bdb_image, BdbLayout};

    fn sample_records() -> RecordMap {
        let mut records = RecordMap::new();
        records.insert(b"\x07version".to_vec(), 169_900u32.to_le_bytes().to_vec());
        records.insert(b"\x04name\x03abc".to_vec(), b"\x05label".to_vec());
        records.insert(b"\x04mkey\x01\x00\x00\x00".to_vec(), vec![0x30; 70]);
        records
    }

    fn image(records: &RecordMap, layout: BdbLayout) -> BdbFile {
        BdbFile::from_bytes(build_bdb_image(records, &layout).unwrap()).unwrap()
    }

    #[test]
    fn test_meta_parse_little_endian() {
        let bdb = image(&sample_records(), BdbLayout::default());
        let meta = bdb.meta();
        assert_eq!(meta.endian, Endian::Little);
        assert_eq!(meta.page_size, 4096);
        assert!(meta.has_subdatabases());
        assert!(bdb.page_count() >= 4);
    }

    #[test]
    fn test_read_main_database() {
        let records = sample_records();
        let bdb = image(&records, BdbLayout::default());
        assert_eq!(bdb.read_database(MAIN_DATABASE).unwrap(), records);
    }

    #[test]
    fn test_read_big_endian_file() {
        let records = sample_records();
        let layout = BdbLayout {
            big_endian: true,
            ..BdbLayout::default()
        };
        let bdb = image(&records, layout);
        assert_eq!(bdb.meta().endian, Endian::Big);
        assert_eq!(bdb.read_database(MAIN_DATABASE).unwrap(), records);
    }

    #[test]
    fn test_read_multiple_leaves_and_overflow_items() {
        let mut records = RecordMap::new();
        for i in 0..200u32 {
            let mut key = b"\x04pool".to_vec();
            key.extend_from_slice(&i.to_be_bytes());
            records.insert(key, vec![i as u8; 40]);
        }
        // Larger than a quarter page: stored on overflow pages
        records.insert(b"\x02tx".to_vec(), (0..3000u32).map(|i| i as u8).collect());

        let layout = BdbLayout {
            page_size: 1024,
            ..BdbLayout::default()
        };
        let bdb = image(&records, layout);
        assert_eq!(bdb.read_database(MAIN_DATABASE).unwrap(), records);
    }

    #[test]
    fn test_missing_main_database_is_not_this_format() {
        let bdb = image(&sample_records(), BdbLayout::default());
        assert!(matches!(
            bdb.read_database("other"),
            Err(WdatError::NotThisFormat(_))
        ));
    }

    #[test]
    fn test_rejects_non_bdb_bytes() {
        assert!(matches!(
            BdbFile::from_bytes(b"SQLite format 3\0".to_vec()),
            Err(WdatError::NotThisFormat(_))
        ));
        assert!(matches!(
            BdbFile::from_bytes(vec![0u8; 4096]),
            Err(WdatError::NotThisFormat(_))
        ));
    }

    #[test]
    fn test_rejects_encrypted_and_checksummed() {
        let mut data = build_bdb_image(&sample_records(), &BdbLayout::default()).unwrap();
        data[DBMETA_ENCRYPT_ALG] = 1;
        assert!(matches!(BdbFile::from_bytes(data.clone()), Err(WdatError::NotThisFormat(_))));
        data[DBMETA_ENCRYPT_ALG] = 0;
        data[DBMETA_METAFLAGS] = DBMETA_CHKSUM;
        assert!(matches!(BdbFile::from_bytes(data), Err(WdatError::NotThisFormat(_))));
    }

    #[test]
    fn test_truncated_file_is_not_this_format() {
        let data = build_bdb_image(&sample_records(), &BdbLayout::default()).unwrap();
        // Keep the metadata page but drop the leaves
        let bdb = BdbFile::from_bytes(data[..4096 * 2].to_vec()).unwrap();
        assert!(matches!(
            bdb.read_database(MAIN_DATABASE),
            Err(WdatError::NotThisFormat(_))
        ));
    }

    #[test]
    fn test_leaf_cycle_is_detected() {
        let records = sample_records();
        let mut data = build_bdb_image(&records, &BdbLayout::default()).unwrap();
        let bdb = BdbFile::from_bytes(data.clone()).unwrap();
        let root = bdb.database_root(MAIN_DATABASE).unwrap() as usize;
        // Point the single leaf's next pointer at itself
        LittleEndian::write_u32(&mut data[root * 4096 + PAGE_NEXT_PGNO..], root as u32);
        let bdb = BdbFile::from_bytes(data).unwrap();
        assert!(matches!(
            bdb.read_database(MAIN_DATABASE),
            Err(WdatError::NotThisFormat(_))
        ));
    }

    #[test]
    fn test_deleted_items_are_skipped() {
        let mut records = RecordMap::new();
        records.insert(b"\x01a".to_vec(), b"first".to_vec());
        records.insert(b"\x01b".to_vec(), b"second".to_vec());
        let mut data = build_bdb_image(&records, &BdbLayout::default()).unwrap();
        let bdb = BdbFile::from_bytes(data.clone()).unwrap();
        let root = bdb.database_root(MAIN_DATABASE).unwrap() as usize;

        // Mark the data item of the first pair deleted
        let page = root * 4096;
        let off = LittleEndian::read_u16(&data[page + SIZE_PAGE_HEADER + 2..]) as usize;
        data[page + off + BKEYDATA_TYPE] |= B_DELETE;

        let bdb = BdbFile::from_bytes(data).unwrap();
        let read = bdb.read_database(MAIN_DATABASE).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read.get(b"\x01b".as_slice()).unwrap(), b"second");
    }

    #[test]
    fn test_page_header_parse() {
        let mut page = vec![0u8; SIZE_PAGE_HEADER];
        LittleEndian::write_u32(&mut page[PAGE_PGNO..], 7);
        LittleEndian::write_u32(&mut page[PAGE_NEXT_PGNO..], 8);
        LittleEndian::write_u16(&mut page[PAGE_ENTRIES..], 4);
        LittleEndian::write_u16(&mut page[PAGE_HF_OFFSET..], 900);
        page[PAGE_LEVEL] = LEAF_LEVEL;
        page[PAGE_TYPE] = P_LBTREE;
        let hdr = PageHeader::parse(&page, Endian::Little).unwrap();
        assert_eq!(hdr.pgno, 7);
        assert_eq!(hdr.next_pgno, 8);
        assert_eq!(hdr.entries, 4);
        assert_eq!(hdr.hf_offset, 900);
        assert_eq!(hdr.level, 1);
        assert_eq!(hdr.page_type, P_LBTREE);
        assert!(PageHeader::parse(&page[..10], Endian::Little).is_none());
    }
}
