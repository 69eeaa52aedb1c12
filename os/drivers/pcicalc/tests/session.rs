use kernel_pci::sim::SimPlatform;
use pcicalc::{
    DriverError, ModuleConfig, Operand, PciCalcDriver, Session, SyntaxError, UserFault,
    UserSliceReader, UserSliceWriter,
};
use std::thread;

fn driver(platform: &SimPlatform) -> PciCalcDriver<'_, SimPlatform> {
    PciCalcDriver::new(ModuleConfig::DEFAULT, platform).unwrap()
}

fn write(session: &Session<'_, '_, SimPlatform>, text: &str) -> Result<usize, DriverError> {
    session.write(&mut text.as_bytes())
}

fn read(session: &Session<'_, '_, SimPlatform>, max: usize, offset: &mut usize) -> Vec<u8> {
    let mut buf = vec![0u8; max];
    let n = session.read(&mut buf.as_mut_slice(), offset).unwrap();
    buf.truncate(n);
    buf
}

/// User memory whose every access faults.
struct Unmapped(usize);

impl UserSliceReader for Unmapped {
    fn len(&self) -> usize {
        self.0
    }

    fn read_into(&mut self, _: &mut [u8]) -> Result<(), UserFault> {
        Err(UserFault)
    }
}

impl UserSliceWriter for Unmapped {
    fn len(&self) -> usize {
        self.0
    }

    fn write_from(&mut self, _: &[u8]) -> Result<(), UserFault> {
        Err(UserFault)
    }
}

#[test]
fn first_read_returns_placeholder() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();
    assert_eq!(read(&session, 10, &mut 0), b"zero\n");
}

#[test]
fn seven_plus_five() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    assert_eq!(write(&session, "7+5\n"), Ok(4));
    let mut offset = 0;
    assert_eq!(read(&session, 10, &mut offset), b"12\n");
    assert_eq!(offset, 3);
}

#[test]
fn negative_operand_a() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    write(&session, "-3+10\n").unwrap();
    assert_eq!(read(&session, 10, &mut 0), b"7\n");
}

#[test]
fn rejected_request_keeps_prior_result() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    assert_eq!(
        write(&session, "abc\n"),
        Err(DriverError::InvalidRequestSyntax(SyntaxError::MissingOperator))
    );
    assert_eq!(read(&session, 10, &mut 0), b"zero\n");

    write(&session, "40+2\n").unwrap();
    for bad in ["12\n", "+5\n", "5+\n", "1+2", "99999999999999999999+1\n"] {
        let err = write(&session, bad).unwrap_err();
        assert!(
            matches!(err, DriverError::InvalidRequestSyntax(_)),
            "{bad:?} gave {err:?}"
        );
        assert_eq!(err.errno(), -22);
        assert_eq!(read(&session, 10, &mut 0), b"42\n");
    }
}

#[test]
fn empty_operands_are_rejected() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    assert_eq!(
        write(&session, "+1\n"),
        Err(SyntaxError::MalformedOperand(Operand::A).into())
    );
    assert_eq!(
        write(&session, "1+\n"),
        Err(SyntaxError::MalformedOperand(Operand::B).into())
    );
}

#[test]
fn zero_length_write_is_invalid() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    assert_eq!(
        write(&session, ""),
        Err(DriverError::InvalidRequestSyntax(SyntaxError::MissingOperator))
    );
}

#[test]
fn write_consumes_the_declared_length() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    assert_eq!(write(&session, "1+2\ntrailing garbage"), Ok(20));
    assert_eq!(read(&session, 10, &mut 0), b"3\n");
}

#[test]
fn shorter_result_replaces_longer_one() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    write(&session, "1000000+1000000\n").unwrap();
    write(&session, "1+1\n").unwrap();
    assert_eq!(read(&session, 100, &mut 0), b"2\n");
}

#[test]
fn overflow_wraps() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    write(&session, "9223372036854775807+1\n").unwrap();
    assert_eq!(read(&session, 100, &mut 0), b"-9223372036854775808\n");
}

#[test]
fn read_past_end_returns_zero() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    write(&session, "2+3\n").unwrap();
    for start in [2, 3, 4096, usize::MAX] {
        let mut offset = start;
        assert_eq!(read(&session, 10, &mut offset), b"");
        assert_eq!(offset, start);
    }
}

#[test]
fn byte_at_a_time_reads_reconstruct_the_result() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    write(&session, "2+3\n").unwrap();
    let mut offset = 0;
    assert_eq!(read(&session, 1, &mut offset), b"5");
    assert_eq!(read(&session, 1, &mut offset), b"\n");
    assert_eq!(read(&session, 1, &mut offset), b"");
    assert_eq!(read(&session, 1, &mut offset), b"");
    assert_eq!(offset, 2);
}

#[test]
fn faulting_user_buffers() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();
    write(&session, "7+5\n").unwrap();

    assert_eq!(
        session.write(&mut Unmapped(4)),
        Err(DriverError::FaultCopyingUserData)
    );
    assert_eq!(DriverError::FaultCopyingUserData.errno(), -14);

    let mut offset = 1;
    assert_eq!(
        session.read(&mut Unmapped(10), &mut offset),
        Err(DriverError::FaultCopyingUserData)
    );
    assert_eq!(offset, 1);
    assert_eq!(read(&session, 10, &mut 0), b"12\n");
}

#[test]
fn end_of_result_never_touches_user_memory() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    for start in [5, 6, usize::MAX] {
        let mut offset = start;
        assert_eq!(session.read(&mut Unmapped(10), &mut offset), Ok(0));
        assert_eq!(offset, start);
    }

    let mut offset = 0;
    assert_eq!(session.read(&mut Unmapped(0), &mut offset), Ok(0));
    assert_eq!(offset, 0);
}

#[test]
fn zero_length_write_skips_the_copy() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    assert_eq!(
        session.write(&mut Unmapped(0)),
        Err(DriverError::InvalidRequestSyntax(SyntaxError::MissingOperator))
    );
    assert_eq!(read(&session, 10, &mut 0), b"zero\n");
}

#[test]
fn unsatisfiable_staging_allocation() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let session = driver.open();

    let err = session.write(&mut Unmapped(usize::MAX)).unwrap_err();
    assert_eq!(err, DriverError::AllocationFailure);
    assert_eq!(err.errno(), -12);
    assert_eq!(read(&session, 10, &mut 0), b"zero\n");
}

#[test]
fn sessions_share_one_result() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    let writer = driver.open();
    let reader = driver.open();

    write(&writer, "20+22\n").unwrap();
    assert_eq!(read(&reader, 10, &mut 0), b"42\n");
}

#[test]
fn sessions_hold_module_references() {
    let platform = SimPlatform::new();
    let driver = driver(&platform);
    assert_eq!(driver.module_refs(), 0);

    let a = driver.open();
    let b = driver.open();
    assert_eq!(driver.module_refs(), 2);

    a.release();
    assert_eq!(driver.module_refs(), 1);
    drop(b);
    assert_eq!(driver.module_refs(), 0);
}

#[test]
fn concurrent_readers_see_whole_results() {
    const ROUNDS: i64 = 500;

    let platform = SimPlatform::new();
    let driver = driver(&platform);

    thread::scope(|s| {
        for w in 0..4 {
            let driver = &driver;
            s.spawn(move || {
                let session = driver.open();
                for i in 0..ROUNDS {
                    let n = w * ROUNDS + i;
                    write(&session, &format!("{n}+{n}\n")).unwrap();
                }
            });
        }
        for _ in 0..4 {
            let driver = &driver;
            s.spawn(move || {
                let session = driver.open();
                for _ in 0..ROUNDS {
                    let line = read(&session, 64, &mut 0);
                    assert_eq!(line.last(), Some(&b'\n'));
                    if line != b"zero\n" {
                        let text = std::str::from_utf8(&line[..line.len() - 1]).unwrap();
                        let value: i64 = text.parse().unwrap();
                        assert_eq!(value % 2, 0, "torn result {text:?}");
                    }
                }
            });
        }
    });

    assert_eq!(driver.module_refs(), 0);
    let last = driver.snapshot();
    assert_eq!(last.last(), Some(&b'\n'));
}
