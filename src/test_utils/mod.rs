use crate::{
    AddressTranslator, FaultStatus, GuestAccessHal, GuestVirtAddr, HostPhysAddr, HostVirtAddr,
    PAGE_SIZE, TranslationFault, TranslationResult,
};
use alloc::vec::Vec;
use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use lazy_static::lazy_static;
use spin::Mutex;

/// Host physical address the simulated memory block starts at.
pub(crate) const BASE_PADDR: usize = 0x8000_0000;

/// Total length of the simulated host memory block, in bytes.
pub(crate) const MEMORY_LEN: usize = 0x10000; // 64KB for testing

// Use #[repr(align(4096))] to ensure 4KB alignment
#[repr(align(4096))]
pub(crate) struct AlignedMemory([u8; MEMORY_LEN]);

impl Default for AlignedMemory {
    fn default() -> Self {
        Self([0; MEMORY_LEN])
    }
}

lazy_static! {
    /// Simulates the host memory backing guest pages.
    pub(crate) static ref MEMORY: Mutex<AlignedMemory> = Mutex::new(AlignedMemory::default());

    /// Global mutex to enforce serial execution for tests that modify shared state.
    pub(crate) static ref TEST_MUTEX: Mutex<()> = Mutex::new(());
}

/// Simulated IRQ mask of the "current core".
pub(crate) static IRQS_ENABLED: AtomicBool = AtomicBool::new(true);

/// A mock platform: host physical memory is the `MEMORY` block, and the IRQ
/// mask is a flag.
#[derive(Debug)]
pub(crate) struct MockHal {}

impl GuestAccessHal for MockHal {
    fn phys_to_virt(paddr: HostPhysAddr) -> HostVirtAddr {
        Self::mock_phys_to_virt(paddr)
    }

    fn irqs_enabled() -> bool {
        IRQS_ENABLED.load(Ordering::SeqCst)
    }

    fn disable_irqs() {
        IRQS_ENABLED.store(false, Ordering::SeqCst);
    }

    fn enable_irqs() {
        IRQS_ENABLED.store(true, Ordering::SeqCst);
    }
}

/// A utility decorator for test functions that require the MockHal state to be reset before execution.
pub(crate) fn mock_hal_test<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = TEST_MUTEX.lock();
    MockHal::reset_state();
    test_fn()
}

impl MockHal {
    /// The "virtual address" is a direct pointer into the `MEMORY` array.
    pub(crate) fn mock_phys_to_virt(paddr: HostPhysAddr) -> HostVirtAddr {
        let paddr_usize = paddr.as_usize();
        assert!(
            paddr_usize >= BASE_PADDR && paddr_usize < BASE_PADDR + MEMORY_LEN,
            "Physical address {:#x} out of bounds",
            paddr_usize
        );
        let offset = paddr_usize - BASE_PADDR;
        HostVirtAddr::from_usize(MEMORY.lock().0.as_ptr() as usize + offset)
    }

    /// Copies bytes out of simulated host memory.
    pub(crate) fn host_bytes(paddr: usize, len: usize) -> Vec<u8> {
        let offset = paddr - BASE_PADDR;
        MEMORY.lock().0[offset..offset + len].to_vec()
    }

    /// Copies bytes into simulated host memory.
    pub(crate) fn fill_host(paddr: usize, bytes: &[u8]) {
        let offset = paddr - BASE_PADDR;
        MEMORY.lock().0[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Resets all static state of the MockHal to its initial, clean state.
    pub(crate) fn reset_state() {
        IRQS_ENABLED.store(true, Ordering::SeqCst);
        MEMORY.lock().0.fill(0);
    }
}

/// One call observed by [`MockTranslator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TranslateCall {
    pub gva: GuestVirtAddr,
    pub irqs_enabled: bool,
}

/// Translator over a flat guest: guest page `n` maps to host page `n` of
/// `MEMORY`, i.e. `gva -> BASE_PADDR + gva`. Pages listed in `unmapped`, and
/// everything beyond `MEMORY_LEN`, fail with a level 3 translation fault.
pub(crate) struct MockTranslator {
    unmapped: Vec<GuestVirtAddr>,
    calls: RefCell<Vec<TranslateCall>>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            unmapped: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Marks the page containing `gva` as not mapped.
    pub fn unmap(mut self, gva: usize) -> Self {
        self.unmapped
            .push(GuestVirtAddr::from_usize(gva & !(PAGE_SIZE - 1)));
        self
    }

    /// Addresses passed to `translate` so far, in order.
    pub fn translated(&self) -> Vec<usize> {
        self.calls.borrow().iter().map(|c| c.gva.as_usize()).collect()
    }

    pub fn calls(&self) -> Vec<TranslateCall> {
        self.calls.borrow().clone()
    }
}

impl AddressTranslator for MockTranslator {
    fn translate(&self, gva: GuestVirtAddr) -> TranslationResult {
        self.calls.borrow_mut().push(TranslateCall {
            gva,
            irqs_enabled: MockHal::irqs_enabled(),
        });

        let page = GuestVirtAddr::from_usize(gva.as_usize() & !(PAGE_SIZE - 1));
        if gva.as_usize() >= MEMORY_LEN || self.unmapped.contains(&page) {
            return Err(TranslationFault {
                gva,
                status: FaultStatus {
                    fst: 0b000111,
                    stage2: false,
                    ptw: false,
                },
            });
        }
        Ok(HostPhysAddr::from_usize(BASE_PADDR + gva.as_usize()))
    }
}
