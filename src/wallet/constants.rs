/// Wallet file and Berkeley DB on-disk constants.
///
/// Berkeley DB values are derived from the `db_page.h` and `btree.h` headers
/// of Berkeley DB 4.x-6.x (the versions that have shipped `wallet.dat`).
/// All offsets are byte offsets from the start of a page.
// Berkeley DB btree metadata page (DBMETA + BTMETA)
pub const BTREE_MAGIC: u32 = 0x0005_3162;
pub const DBMETA_PGNO: usize = 8; // 4 bytes - page number (always 0 for the master meta)
pub const DBMETA_MAGIC: usize = 12; // 4 bytes - magic, byte order reveals file endianness
pub const DBMETA_VERSION: usize = 16; // 4 bytes - btree format version
pub const DBMETA_PAGESIZE: usize = 20; // 4 bytes - page size in bytes
pub const DBMETA_ENCRYPT_ALG: usize = 24; // 1 byte - encryption algorithm (0 = none)
pub const DBMETA_TYPE: usize = 25; // 1 byte - page type (P_BTREEMETA)
pub const DBMETA_METAFLAGS: usize = 26; // 1 byte - meta flags (checksums, ...)
pub const DBMETA_FREE: usize = 28; // 4 bytes - free list head
pub const DBMETA_LAST_PGNO: usize = 32; // 4 bytes - last page number in file
pub const DBMETA_FLAGS: usize = 48; // 4 bytes - database flags (BTM_*)
pub const BTMETA_ROOT: usize = 88; // 4 bytes - root page of the btree
pub const SIZE_BTREE_META: usize = 92;

pub const BTREE_VERSION_MIN: u32 = 7;
pub const BTREE_VERSION_MAX: u32 = 10;
pub const MIN_PAGE_SIZE: u32 = 512;
pub const MAX_PAGE_SIZE: u32 = 65536;

pub const BTM_SUBDB: u32 = 0x20; // file holds multiple named databases
pub const DBMETA_CHKSUM: u8 = 0x01; // pages carry a checksum after the header

// Generic page header (26 bytes, every non-meta page)
pub const PAGE_PGNO: usize = 8; // 4 bytes - this page's number
pub const PAGE_PREV_PGNO: usize = 12; // 4 bytes - previous leaf
pub const PAGE_NEXT_PGNO: usize = 16; // 4 bytes - next leaf / next overflow page
pub const PAGE_ENTRIES: usize = 20; // 2 bytes - number of item indexes
pub const PAGE_HF_OFFSET: usize = 22; // 2 bytes - high free byte (bytes used on overflow pages)
pub const PAGE_LEVEL: usize = 24; // 1 byte - btree level (1 = leaf)
pub const PAGE_TYPE: usize = 25; // 1 byte - page type
pub const SIZE_PAGE_HEADER: usize = 26;

pub const PGNO_INVALID: u32 = 0;
pub const LEAF_LEVEL: u8 = 1;

// Page types
pub const P_IBTREE: u8 = 3;
pub const P_LBTREE: u8 = 5;
pub const P_OVERFLOW: u8 = 7;
pub const P_BTREEMETA: u8 = 9;

// Item types (low 7 bits of the item type byte)
pub const B_KEYDATA: u8 = 1;
pub const B_DUPLICATE: u8 = 2;
pub const B_OVERFLOW: u8 = 3;
pub const B_DELETE: u8 = 0x80;

// BKEYDATA item: [len:2][type:1][data...]
pub const BKEYDATA_LEN: usize = 0;
pub const BKEYDATA_TYPE: usize = 2;
pub const BKEYDATA_DATA: usize = 3;

// BOVERFLOW item: [unused:2][type:1][unused:1][pgno:4][tlen:4]
pub const BOVERFLOW_PGNO: usize = 4;
pub const BOVERFLOW_TLEN: usize = 8;
pub const SIZE_BOVERFLOW: usize = 12;

// BINTERNAL item: [len:2][type:1][unused:1][pgno:4][nrecs:4][data...]
pub const BINTERNAL_LEN: usize = 0;
pub const BINTERNAL_TYPE: usize = 2;
pub const BINTERNAL_PGNO: usize = 4;
pub const BINTERNAL_NRECS: usize = 8;
pub const BINTERNAL_DATA: usize = 12;

/// Name of the sub-database that holds wallet records.
pub const MAIN_DATABASE: &str = "main";

// Wallet record type tags (CompactSize-prefixed at the start of every key)
pub const MKEY_TAG: &[u8] = b"mkey";
pub const KEY_TAG: &[u8] = b"key";
pub const CKEY_TAG: &[u8] = b"ckey";
pub const KEYMETA_TAG: &[u8] = b"keymeta";
pub const NAME_TAG: &[u8] = b"name";

/// Fixed key of the master-key record in SQLite wallets: tag `mkey` plus the
/// little-endian master key id 1.
pub const SQLITE_MKEY_KEY: [u8; 9] = [0x04, b'm', b'k', b'e', b'y', 0x01, 0x00, 0x00, 0x00];

// Master-key record defaults when the trailing method/iterations pair is absent
pub const DEFAULT_DERIVATION_METHOD: u32 = 0;
pub const DEFAULT_ITERATIONS: u32 = 1;

/// Bytes of `encrypted_key` that hold the encrypted master key (the rest is IV).
pub const MASTER_KEY_LEN: usize = 32;

/// File extensions scanned for when no wallet files are given.
pub const WALLET_EXTENSIONS: &[&str] = &["dat"];
