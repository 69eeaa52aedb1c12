use kernel_pci::sim::{SimEvent, SimFault, SimPlatform};
use kernel_pci::{
    CoherentBuffer, MappedWindow, PAGE_SIZE, PciDeviceId, PciError, PciLocation, RegionClaim,
};

const ID: PciDeviceId = PciDeviceId::new(0x1234, 0xCA1C);
const LOC: PciLocation = PciLocation::new(0, 3, 0);

#[test]
fn guards_release_in_reverse_declaration_order() {
    let platform = SimPlatform::new();
    let func = platform.add_device(LOC, ID);

    {
        let claim = RegionClaim::request(&platform, &func, 0, "devres-test").unwrap();
        let window = MappedWindow::map(&claim, PAGE_SIZE).unwrap();
        let buffer = CoherentBuffer::alloc(&platform, &func, PAGE_SIZE).unwrap();
        assert_eq!(platform.outstanding().regions, 1);
        assert_eq!(platform.outstanding().windows, 1);
        assert_eq!(platform.outstanding().dma, 1);
        assert_eq!(platform.claim_owner(&func, 0), Some("devres-test"));
        platform.clear_events();

        drop(buffer);
        drop(window);
        drop(claim);
    }

    assert!(platform.outstanding().is_empty());
    let events = platform.events();
    assert!(matches!(events[0], SimEvent::DmaFreed { .. }));
    assert!(matches!(events[1], SimEvent::BarUnmapped { .. }));
    assert!(matches!(events[2], SimEvent::RegionReleased { bar: 0, .. }));
}

#[test]
fn second_claim_is_busy_until_the_first_is_dropped() {
    let platform = SimPlatform::new();
    let func = platform.add_device(LOC, ID);

    let first = RegionClaim::request(&platform, &func, 0, "a").unwrap();
    assert_eq!(
        RegionClaim::request(&platform, &func, 0, "b").err(),
        Some(PciError::RegionBusy {
            location: LOC,
            bar: 0
        })
    );
    drop(first);
    assert!(RegionClaim::request(&platform, &func, 0, "b").is_ok());
}

#[test]
fn missing_bar_and_oversized_window_are_rejected() {
    let platform = SimPlatform::new();
    let func = platform.add_device(LOC, ID);

    assert!(matches!(
        RegionClaim::request(&platform, &func, 2, "x").err(),
        Some(PciError::NoSuchBar { bar: 2, .. })
    ));

    let claim = RegionClaim::request(&platform, &func, 0, "x").unwrap();
    assert!(matches!(
        MappedWindow::map(&claim, 2 * PAGE_SIZE).err(),
        Some(PciError::BarTooSmall { size: 4096, len: 8192, .. })
    ));
    assert_eq!(platform.outstanding().windows, 0);
}

#[test]
fn register_writes_survive_the_mapping() {
    let platform = SimPlatform::new();
    let func = platform.add_device(LOC, ID);

    {
        let claim = RegionClaim::request(&platform, &func, 0, "x").unwrap();
        let mut window = MappedWindow::map(&claim, PAGE_SIZE).unwrap();
        window.window_mut().write_u64(0, 0xDEAD_BEEF_0000).unwrap();
        assert_eq!(window.window().read_u64(0).unwrap(), 0xDEAD_BEEF_0000);
    }

    assert_eq!(platform.read_register(&func, 0, 0), Some(0xDEAD_BEEF_0000));
}

#[test]
fn coherent_buffers_are_zeroed_page_aligned_and_distinct() {
    let platform = SimPlatform::new();
    let func = platform.add_device(LOC, ID);

    let mut a = CoherentBuffer::alloc(&platform, &func, PAGE_SIZE).unwrap();
    let b = CoherentBuffer::alloc(&platform, &func, PAGE_SIZE).unwrap();
    assert!(a.phys().is_page_aligned());
    assert_ne!(a.phys(), b.phys());
    assert!(a.region().as_slice().iter().all(|&x| x == 0));

    a.region_mut().as_mut_slice()[..3].copy_from_slice(b"abc");
    assert_eq!(&platform.dma_snapshot(a.phys()).unwrap()[..3], b"abc");
}

#[test]
fn injected_faults_fire_once() {
    let platform = SimPlatform::new();
    let func = platform.add_device(LOC, ID);

    platform.inject(SimFault::AllocDma);
    assert_eq!(
        CoherentBuffer::alloc(&platform, &func, PAGE_SIZE).err(),
        Some(PciError::DmaAllocFailed { len: PAGE_SIZE })
    );
    assert!(CoherentBuffer::alloc(&platform, &func, PAGE_SIZE).is_ok());

    platform.inject(SimFault::MapBar);
    let claim = RegionClaim::request(&platform, &func, 0, "x").unwrap();
    assert!(MappedWindow::map(&claim, PAGE_SIZE).is_err());
    assert!(MappedWindow::map(&claim, PAGE_SIZE).is_ok());
}

#[test]
fn command_register_round_trips_through_config_space() {
    use kernel_pci::PciPlatform;

    let platform = SimPlatform::new();
    let func = platform.add_device(LOC, ID);

    let cmd = platform.read_command(&func).unwrap().dma_enabled();
    platform.write_command(&func, cmd).unwrap();
    assert!(platform.command(&func).unwrap().is_dma_enabled());

    platform.inject(SimFault::WriteCommand);
    assert_eq!(
        platform.write_command(&func, cmd.dma_disabled()),
        Err(PciError::ConfigAccess { location: LOC })
    );
    assert!(platform.command(&func).unwrap().is_dma_enabled());
}
