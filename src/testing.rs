//! In-memory stand-ins for the kernel's collaborators, for unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::config::{MAX_ARGS, PAGE_SIZE, WORD_SIZE};
use crate::drivers::Console;
use crate::fs::{FileLock, FileSystem};
use crate::mm::{AddressSpace, VirtAddr};
use crate::process::{LoadError, Loader, Process};
use crate::trap::TrapFrame;

/// Where `FlatMemory` maps its first page.
pub const USER_BASE: usize = 0x0804_8000;

/// A contiguous run of mapped user pages backed by a `Vec`.
///
/// Data is bump-allocated from the bottom; the syscall frame is written at
/// the top, the way a user program pushes it before `int $0x30`.
pub struct FlatMemory {
    data: Vec<u8>,
    next: usize,
}

impl FlatMemory {
    pub fn new(pages: usize) -> Self {
        Self {
            data: vec![0; pages * PAGE_SIZE],
            next: USER_BASE,
        }
    }

    /// One past the last mapped byte.
    pub fn end(&self) -> usize {
        USER_BASE + self.data.len()
    }

    pub fn store(&mut self, addr: usize, bytes: &[u8]) {
        let offset = addr - USER_BASE;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn load(&self, addr: usize, len: usize) -> &[u8] {
        let offset = addr - USER_BASE;
        &self.data[offset..offset + len]
    }

    /// Reserve `len` bytes and return their address.
    pub fn alloc(&mut self, len: usize) -> u32 {
        let addr = self.next;
        self.next += len.max(1);
        addr as u32
    }

    /// Place a NUL-terminated copy of `s` and return its address.
    pub fn alloc_str(&mut self, s: &str) -> u32 {
        let addr = self.alloc(s.len() + 1);
        self.store(addr as usize, s.as_bytes());
        self.store(addr as usize + s.len(), &[0]);
        addr
    }

    /// Push a syscall number and its arguments at the top of the stack.
    pub fn push_call(&mut self, number: u32, args: &[u32]) -> TrapFrame {
        assert!(args.len() <= MAX_ARGS);
        let esp = self.end() - (MAX_ARGS + 1) * WORD_SIZE;
        self.store(esp, &number.to_le_bytes());
        for (i, arg) in args.iter().enumerate() {
            self.store(esp + (i + 1) * WORD_SIZE, &arg.to_le_bytes());
        }
        TrapFrame::syscall(esp as u32)
    }
}

impl AddressSpace for FlatMemory {
    fn is_mapped(&self, page: VirtAddr) -> bool {
        (USER_BASE..self.end()).contains(&page.as_usize())
    }

    unsafe fn bytes(&self, start: VirtAddr, len: usize) -> &[u8] {
        self.load(start.as_usize(), len)
    }

    unsafe fn bytes_mut(&mut self, start: VirtAddr, len: usize) -> &mut [u8] {
        let offset = start.as_usize() - USER_BASE;
        &mut self.data[offset..offset + len]
    }
}

/// Counters shared between a `MemFs` and the test that built it.
#[derive(Default)]
pub struct FsStats {
    busy: AtomicBool,
    calls: AtomicUsize,
    overlaps: AtomicUsize,
    open: AtomicIsize,
}

impl FsStats {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that started while another was still running.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    /// Handles opened and not yet closed.
    pub fn open_handles(&self) -> isize {
        self.open.load(Ordering::SeqCst)
    }
}

struct CallGuard(Arc<FsStats>);

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::SeqCst);
    }
}

type Contents = Arc<Mutex<Vec<u8>>>;

/// An open `MemFs` file.
#[derive(Debug)]
pub struct MemFile {
    pub name: String,
    data: Contents,
    pos: u32,
}

/// A filesystem held entirely in memory that notices overlapping calls.
pub struct MemFs {
    files: BTreeMap<String, Contents>,
    stats: Arc<FsStats>,
}

impl MemFs {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            stats: Arc::new(FsStats::default()),
        }
    }

    pub fn with_file(mut self, name: &str, contents: &[u8]) -> Self {
        self.files
            .insert(name.into(), Arc::new(Mutex::new(contents.to_vec())));
        self
    }

    pub fn stats(&self) -> Arc<FsStats> {
        Arc::clone(&self.stats)
    }

    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.files.get(name).map(|data| data.lock().unwrap().clone())
    }

    fn enter(&self) -> CallGuard {
        if self.stats.busy.swap(true, Ordering::SeqCst) {
            self.stats.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        // Widen the window in which an unserialized caller would collide.
        thread::yield_now();
        CallGuard(Arc::clone(&self.stats))
    }
}

impl FileSystem for MemFs {
    type File = MemFile;

    fn create(&mut self, path: &str, initial_size: u32) -> bool {
        let _call = self.enter();
        if path.is_empty() || self.files.contains_key(path) {
            return false;
        }
        let data = vec![0; initial_size as usize];
        self.files.insert(path.into(), Arc::new(Mutex::new(data)));
        true
    }

    fn remove(&mut self, path: &str) -> bool {
        let _call = self.enter();
        self.files.remove(path).is_some()
    }

    fn open(&mut self, path: &str) -> Option<MemFile> {
        let _call = self.enter();
        let data = Arc::clone(self.files.get(path)?);
        self.stats.open.fetch_add(1, Ordering::SeqCst);
        Some(MemFile {
            name: path.into(),
            data,
            pos: 0,
        })
    }

    fn length(&mut self, file: &MemFile) -> u32 {
        let _call = self.enter();
        file.data.lock().unwrap().len() as u32
    }

    fn read(&mut self, file: &mut MemFile, buf: &mut [u8]) -> u32 {
        let _call = self.enter();
        let data = file.data.lock().unwrap();
        let start = (file.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        file.pos += n as u32;
        n as u32
    }

    fn write(&mut self, file: &mut MemFile, buf: &[u8]) -> u32 {
        let _call = self.enter();
        let mut data = file.data.lock().unwrap();
        let start = file.pos as usize;
        if data.len() < start + buf.len() {
            data.resize(start + buf.len(), 0);
        }
        data[start..start + buf.len()].copy_from_slice(buf);
        file.pos += buf.len() as u32;
        buf.len() as u32
    }

    fn seek(&mut self, file: &mut MemFile, position: u32) {
        let _call = self.enter();
        file.pos = position;
    }

    fn tell(&mut self, file: &MemFile) -> u32 {
        let _call = self.enter();
        file.pos
    }

    fn close(&mut self, file: MemFile) {
        let _call = self.enter();
        self.stats.open.fetch_sub(1, Ordering::SeqCst);
        drop(file);
    }
}

/// A console fed from a script and captured into a buffer.
#[derive(Default)]
pub struct ScriptedConsole {
    input: Mutex<VecDeque<u8>>,
    output: Mutex<Vec<u8>>,
}

impl ScriptedConsole {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: Mutex::new(input.iter().copied().collect()),
            output: Mutex::new(Vec::new()),
        }
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output.lock().unwrap()).into_owned()
    }

    pub fn pending_input(&self) -> usize {
        self.input.lock().unwrap().len()
    }
}

impl Console for ScriptedConsole {
    fn getc(&self) -> u8 {
        loop {
            if let Some(key) = self.input.lock().unwrap().pop_front() {
                return key;
            }
            thread::yield_now();
        }
    }

    fn putbuf(&self, buf: &[u8]) {
        self.output.lock().unwrap().extend_from_slice(buf);
    }
}

/// A loader that starts any command whose program name is a file in the
/// filesystem, and parks every child it starts so a test can run it on a
/// thread of its own.
#[derive(Default)]
pub struct InlineLoader {
    started: Mutex<VecDeque<Process<MemFile>>>,
}

impl InlineLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// The oldest child not yet claimed by the test.
    pub fn take_started(&self) -> Option<Process<MemFile>> {
        self.started.lock().unwrap().pop_front()
    }
}

impl Loader<MemFs> for InlineLoader {
    fn execute(
        &self,
        cmd_line: &str,
        child: Process<MemFile>,
        files: &FileLock<MemFs>,
    ) -> Result<(), LoadError> {
        let name = cmd_line.split_whitespace().next().unwrap_or("");
        let image = files.with(|fs| fs.open(name)).ok_or(LoadError::NotFound)?;
        let len = files.with(|fs| fs.length(&image));
        files.with(|fs| fs.close(image));
        if len == 0 {
            return Err(LoadError::BadImage);
        }
        self.started.lock().unwrap().push_back(child);
        Ok(())
    }
}
