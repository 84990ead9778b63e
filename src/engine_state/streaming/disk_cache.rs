//! # Disk Cache
//!
//! One cache file per evicted chunk of one block category, named
//! `<s|f>chnk<id>.cache` inside the configured cache directory.
//!
//! The cache keeps a bit per chunk id recording which files it wrote, so
//! residency checks never touch the file system. Files are deleted when the
//! chunk is reloaded, when the world is reset, and when the cache is dropped.
//! Stale files from an earlier run are purged on creation.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bitvec::prelude::BitVec;

use crate::engine_state::voxels::block::{Block, BlockKind};
use crate::engine_state::voxels::chunk::chunk_grid::{ChunkId, GRID_SIZE};
use crate::error::CodecResult;

use super::codec;

/// Chunk cache files of one block category.
#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
    kind: BlockKind,
    cached: BitVec,
}

impl DiskCache {
    /// Opens the cache in `dir`, creating the directory and deleting any
    /// leftover files of this category.
    pub fn new(dir: &Path, kind: BlockKind) -> CodecResult<Self> {
        fs::create_dir_all(dir)?;
        let cache = DiskCache {
            dir: dir.to_path_buf(),
            kind,
            cached: BitVec::repeat(false, GRID_SIZE),
        };
        cache.purge_stale()?;
        Ok(cache)
    }

    /// Directory holding the cache files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name prefix shared by every file of this category.
    fn prefix(&self) -> String {
        format!("{}chnk", self.kind.cache_prefix())
    }

    /// Path of the cache file for `id`.
    pub fn path(&self, id: ChunkId) -> PathBuf {
        self.dir.join(format!("{}{}.cache", self.prefix(), id.0))
    }

    /// Whether a cache file for `id` exists.
    pub fn is_cached(&self, id: ChunkId) -> bool {
        self.cached[id.0 as usize]
    }

    /// Ids with a cache file, ascending.
    pub fn cached_ids(&self) -> impl Iterator<Item = ChunkId> + '_ {
        self.cached.iter_ones().map(|index| ChunkId(index as u8))
    }

    /// Number of cache files.
    pub fn len(&self) -> usize {
        self.cached.count_ones()
    }

    /// Whether no chunk is cached.
    pub fn is_empty(&self) -> bool {
        self.cached.not_any()
    }

    /// Serializes a chunk to its cache file.
    pub fn write(&mut self, id: ChunkId, blocks: &[Block]) -> CodecResult<()> {
        let path = self.path(id);
        let mut writer = BufWriter::new(File::create(&path)?);
        codec::write_chunk(&mut writer, id, blocks)?;
        writer.flush()?;
        self.cached.set(id.0 as usize, true);
        log::debug!("Wrote {} {} blocks to {:?}", blocks.len(), self.kind, path);
        Ok(())
    }

    /// Reads the blocks cached for `id` without deleting the file.
    pub fn read(&self, id: ChunkId) -> CodecResult<Vec<Block>> {
        let mut reader = BufReader::new(File::open(self.path(id))?);
        codec::read_chunk(&mut reader, id, self.kind)
    }

    /// Reads only the block count stored in the cache file for `id`.
    pub fn read_count(&self, id: ChunkId) -> CodecResult<usize> {
        let mut reader = BufReader::new(File::open(self.path(id))?);
        let (_, count) = codec::read_chunk_header(&mut reader)?;
        Ok(count as usize)
    }

    /// Deletes the cache file for `id`.
    pub fn discard(&mut self, id: ChunkId) -> CodecResult<()> {
        match fs::remove_file(self.path(id)) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }
        self.cached.set(id.0 as usize, false);
        Ok(())
    }

    /// Deletes every cache file this cache wrote.
    pub fn clear(&mut self) {
        let ids: Vec<ChunkId> = self.cached_ids().collect();
        for id in ids {
            if let Err(error) = self.discard(id) {
                log::warn!("Could not delete cache file {:?}: {}", self.path(id), error);
            }
        }
    }

    fn purge_stale(&self) -> CodecResult<()> {
        let prefix = self.prefix();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let stale = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".cache"));
            if stale {
                log::debug!("Purging stale cache file {:?}", path);
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

impl Drop for DiskCache {
    fn drop(&mut self) {
        self.clear();
    }
}
