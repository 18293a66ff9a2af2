use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use rusqlite::{params, OpenFlags};

use crate::bag::domain::bag_error::BagError;
use crate::bag::domain::bag_reader::{BagMessage, BagReader, Connection, MessageIter};
use crate::shared::constants::SQLITE_STORAGE_EXTENSION;

/// Rows fetched per query while iterating a topic.
const PAGE_SIZE: i64 = 64;

const PAGE_QUERY: &str = "SELECT id, timestamp, data FROM messages
     WHERE topic_id = ?1 AND (timestamp > ?2 OR (timestamp = ?2 AND id > ?3))
     ORDER BY timestamp, id
     LIMIT ?4";

/// One `.db3` split of a bag.
struct StorageFile {
    path: PathBuf,
    conn: rusqlite::Connection,
    /// Topic name to this file's `topics.id`.
    topic_ids: HashMap<String, i64>,
}

/// Reads rosbag2 recordings stored with the sqlite3 storage plugin.
///
/// Splits are read in file-name order, which rosbag2 keeps chronological.
/// Messages are paged with a `(timestamp, id)` keyset so a topic never has
/// to fit in memory.
pub struct SqliteBagReader {
    path: PathBuf,
    files: Vec<StorageFile>,
    connections: Vec<Connection>,
}

impl SqliteBagReader {
    pub fn open(bag_dir: &Path) -> Result<Self, BagError> {
        if !bag_dir.is_dir() {
            return Err(BagError::InvalidBagPath(bag_dir.to_path_buf()));
        }
        let paths = storage_files(bag_dir)?;
        if paths.is_empty() {
            return Err(BagError::NoStorage(bag_dir.to_path_buf()));
        }

        let mut files = Vec::with_capacity(paths.len());
        let mut connections: Vec<Connection> = Vec::new();
        for path in paths {
            let file = open_storage(&path)?;
            for (topic, msgtype) in read_topics(&file)? {
                if !connections.iter().any(|c| c.topic == topic) {
                    connections.push(Connection::new(topic, msgtype));
                }
            }
            files.push(file);
        }

        log::debug!(
            "Opened {} with {} storage file(s) and {} topic(s)",
            bag_dir.display(),
            files.len(),
            connections.len()
        );

        Ok(Self {
            path: bag_dir.to_path_buf(),
            files,
            connections,
        })
    }
}

impl BagReader for SqliteBagReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn messages<'a>(&'a self, connection: &Connection) -> Result<MessageIter<'a>, BagError> {
        Ok(Box::new(MessageCursor {
            files: &self.files,
            file_index: 0,
            connection: connection.clone(),
            after: (i64::MIN, i64::MIN),
            buffer: VecDeque::new(),
            failed: false,
        }))
    }
}

fn storage_files(bag_dir: &Path) -> Result<Vec<PathBuf>, BagError> {
    let io_err = |source| BagError::Io {
        path: bag_dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(bag_dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_storage = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == SQLITE_STORAGE_EXTENSION);
        if is_storage && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn open_storage(path: &Path) -> Result<StorageFile, BagError> {
    let conn = rusqlite::Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|source| storage_error(path, source))?;
    let mut file = StorageFile {
        path: path.to_path_buf(),
        conn,
        topic_ids: HashMap::new(),
    };
    let ids = read_topic_ids(&file)?;
    file.topic_ids = ids;
    Ok(file)
}

fn read_topic_ids(file: &StorageFile) -> Result<HashMap<String, i64>, BagError> {
    let mut stmt = file
        .conn
        .prepare("SELECT id, name FROM topics")
        .map_err(|e| storage_error(&file.path, e))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)?)))
        .map_err(|e| storage_error(&file.path, e))?;
    let ids = rows
        .collect::<Result<HashMap<_, _>, _>>()
        .map_err(|e| storage_error(&file.path, e))?;
    Ok(ids)
}

fn read_topics(file: &StorageFile) -> Result<Vec<(String, String)>, BagError> {
    let mut stmt = file
        .conn
        .prepare("SELECT name, type FROM topics ORDER BY id")
        .map_err(|e| storage_error(&file.path, e))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| storage_error(&file.path, e))?;
    let topics = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| storage_error(&file.path, e))?;
    Ok(topics)
}

fn storage_error(path: &Path, source: rusqlite::Error) -> BagError {
    BagError::Storage {
        path: path.to_path_buf(),
        source,
    }
}

/// `(id, timestamp, data)` of a `messages` row.
type Row = (i64, i64, Vec<u8>);

struct MessageCursor<'a> {
    files: &'a [StorageFile],
    file_index: usize,
    connection: Connection,
    /// Keyset position `(timestamp, id)` of the last row read from the
    /// current file.
    after: (i64, i64),
    buffer: VecDeque<BagMessage>,
    failed: bool,
}

impl MessageCursor<'_> {
    fn fetch_page(&self, file: &StorageFile, topic_id: i64) -> Result<Vec<Row>, BagError> {
        let mut stmt = file
            .conn
            .prepare(PAGE_QUERY)
            .map_err(|e| storage_error(&file.path, e))?;
        let rows = stmt
            .query_map(params![topic_id, self.after.0, self.after.1, PAGE_SIZE], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(|e| storage_error(&file.path, e))?;
        let page = rows
            .collect::<Result<Vec<Row>, _>>()
            .map_err(|e| storage_error(&file.path, e))?;
        Ok(page)
    }

    fn next_file(&mut self) {
        self.file_index += 1;
        self.after = (i64::MIN, i64::MIN);
    }
}

impl Iterator for MessageCursor<'_> {
    type Item = Result<BagMessage, BagError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(message) = self.buffer.pop_front() {
                return Some(Ok(message));
            }
            if self.failed {
                return None;
            }
            let file = self.files.get(self.file_index)?;
            let Some(&topic_id) = file.topic_ids.get(&self.connection.topic) else {
                self.next_file();
                continue;
            };

            let rows = match self.fetch_page(file, topic_id) {
                Ok(rows) => rows,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            };
            let Some(&(last_id, last_timestamp, _)) = rows.last() else {
                self.next_file();
                continue;
            };
            self.after = (last_timestamp, last_id);
            self.buffer.extend(rows.into_iter().map(|(_, timestamp, data)| BagMessage {
                connection: self.connection.clone(),
                timestamp,
                data,
            }));
        }
    }
}
