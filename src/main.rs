#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod image {
    use bootloader::bootinfo::MemoryRegionType;
    use bootloader::{entry_point, BootInfo};
    use core::panic::PanicInfo;
    use log::LevelFilter;
    use tsos::memory::map::{usable_bytes, MemoryRegion, RegionKind};
    use tsos::process::EntryPoint;
    use tsos::{serial_print, serial_println, KernelConfig};
    use x86_64::instructions::interrupts;
    use x86_64::VirtAddr;

    entry_point!(kernel_main);

    fn kernel_main(boot_info: &'static BootInfo) -> ! {
        tsos::logger::init(LevelFilter::Info).expect("logger installed twice");
        serial_println!("Welcome to tsos!");

        tsos::arch::x86_64::interrupts::init();

        let regions = boot_info.memory_map.iter().map(|region| {
            let kind = match region.region_type {
                MemoryRegionType::Usable => RegionKind::Usable,
                _ => RegionKind::Reserved,
            };
            MemoryRegion::new(region.range.start_addr(), region.range.end_addr(), kind)
        });
        let total = usable_bytes(regions);
        log::info!("{} KiB of usable memory", total / 1024);

        let offset = VirtAddr::new(boot_info.physical_memory_offset);
        unsafe { tsos::init(KernelConfig::default(), total, offset) }
            .expect("kernel state does not fit the memory map");

        match tsos::allocate_frame() {
            Some(frame) => {
                log::info!("first free frame at {:#x}", frame.start_address());
                tsos::free_frame(frame);
            }
            None => log::warn!("no physical frames left after boot"),
        }

        let workers: [EntryPoint; 2] = [worker_a, worker_b];
        for worker in workers {
            if tsos::process_create(worker, 1) == 0 {
                log::warn!("demo process was not created");
            }
        }

        interrupts::enable();
        tsos::hlt_loop();
    }

    // New processes start inside the timer interrupt with interrupts masked.
    extern "C" fn worker_a() -> ! {
        interrupts::enable();
        spin("A")
    }

    extern "C" fn worker_b() -> ! {
        interrupts::enable();
        spin("B")
    }

    fn spin(tag: &str) -> ! {
        let mut round: u64 = 0;
        loop {
            if round % 1_000_000 == 0 {
                serial_print!("{}", tag);
            }
            round = round.wrapping_add(1);
            core::hint::spin_loop();
        }
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        serial_println!("{}", info);
        tsos::hlt_loop();
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("tsos is a kernel image; build it with `cargo bootimage --target x86_64-tsos.json`");
    std::process::exit(1);
}
