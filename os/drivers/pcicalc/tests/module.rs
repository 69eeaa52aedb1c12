use kernel_pci::sim::SimPlatform;
use kernel_pci::{PciDeviceId, PciLocation};
use pcicalc::{
    BindingState, CharDevRegistry, ChrdevError, DriverError, ModuleConfig, PciCalcModule,
    RegistrationError,
};
use std::sync::Mutex;

#[derive(Default)]
struct Registry {
    registered: Mutex<Vec<(u32, &'static str)>>,
    taken: Vec<u32>,
}

impl CharDevRegistry for Registry {
    fn register(&self, major: u32, name: &'static str) -> Result<(), ChrdevError> {
        let mut registered = self.registered.lock().unwrap();
        if self.taken.contains(&major) || registered.iter().any(|(m, _)| *m == major) {
            return Err(ChrdevError::MajorInUse(major));
        }
        registered.push((major, name));
        Ok(())
    }

    fn unregister(&self, major: u32, name: &'static str) {
        self.registered
            .lock()
            .unwrap()
            .retain(|entry| *entry != (major, name));
    }
}

#[test]
fn init_registers_major_200_with_placeholder_result() {
    let platform = SimPlatform::new();
    let registry = Registry::default();

    let module = PciCalcModule::init(ModuleConfig::DEFAULT, &platform, &registry).unwrap();
    assert_eq!(
        *registry.registered.lock().unwrap(),
        [(200, "pcicalculator")]
    );
    assert_eq!(module.driver().snapshot(), b"zero\n");
    assert_eq!(module.driver().binding_state(), BindingState::Unbound);

    module.exit();
    assert!(registry.registered.lock().unwrap().is_empty());
}

#[test]
fn taken_major_aborts_init() {
    let platform = SimPlatform::new();
    let registry = Registry {
        taken: vec![200],
        ..Registry::default()
    };

    let err = PciCalcModule::init(ModuleConfig::DEFAULT, &platform, &registry)
        .err()
        .unwrap();
    assert_eq!(
        err,
        DriverError::DeviceRegistrationFailure(RegistrationError::Chrdev(
            ChrdevError::MajorInUse(200)
        ))
    );
    assert_eq!(err.errno(), -16);
    assert!(registry.registered.lock().unwrap().is_empty());
}

#[test]
fn configured_major_and_name_are_used() {
    let platform = SimPlatform::new();
    let registry = Registry::default();
    let config = ModuleConfig {
        major: 240,
        name: "calc",
        ..ModuleConfig::DEFAULT
    };

    let module = PciCalcModule::init(config, &platform, &registry).unwrap();
    assert_eq!(*registry.registered.lock().unwrap(), [(240, "calc")]);
    drop(module);
    assert!(registry.registered.lock().unwrap().is_empty());
}

#[test]
fn sessions_see_results_across_reopen() {
    let platform = SimPlatform::new();
    let registry = Registry::default();
    let module = PciCalcModule::init(ModuleConfig::DEFAULT, &platform, &registry).unwrap();

    let session = module.driver().open();
    assert_eq!(module.driver().module_refs(), 1);
    session.write(&mut &b"7+5\n"[..]).unwrap();
    session.release();
    assert_eq!(module.driver().module_refs(), 0);

    let session = module.driver().open();
    let mut buf = [0u8; 10];
    let mut offset = 0;
    let n = session.read(&mut &mut buf[..], &mut offset).unwrap();
    assert_eq!(&buf[..n], b"12\n");
}

#[test]
fn unload_detaches_the_bound_device() {
    let platform = SimPlatform::new();
    let registry = Registry::default();
    let func = platform.add_device(PciLocation::new(0, 3, 0), PciDeviceId::new(0x1234, 0xCA1C));

    let module = PciCalcModule::init(ModuleConfig::DEFAULT, &platform, &registry).unwrap();
    module.driver().probe(&func).unwrap();
    assert!(!platform.outstanding().is_empty());

    module.exit();
    assert!(platform.outstanding().is_empty());
    assert_eq!(platform.read_register(&func, 0, 0), Some(0));
    assert!(registry.registered.lock().unwrap().is_empty());
}

#[test]
fn reload_starts_from_placeholder() {
    let platform = SimPlatform::new();
    let registry = Registry::default();

    let module = PciCalcModule::init(ModuleConfig::DEFAULT, &platform, &registry).unwrap();
    module.driver().open().write(&mut &b"1+1\n"[..]).unwrap();
    assert_eq!(module.driver().snapshot(), b"2\n");
    module.exit();

    let module = PciCalcModule::init(ModuleConfig::DEFAULT, &platform, &registry).unwrap();
    assert_eq!(module.driver().snapshot(), b"zero\n");
}
