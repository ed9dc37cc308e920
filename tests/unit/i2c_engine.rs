//! Blocking I2C engine adapter against a mocked embedded-hal bus

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
use mpu9150_irq::engine::status;
use mpu9150_irq::{
    Builder, Completion, I2cEngine, OperationKind, RegisterOperation, Request, TransactionEngine,
    TransactionError, TransactionOutcome,
};

const ADDR: u8 = 0x68;

fn reset_transactions() -> Vec<I2cTransaction> {
    vec![
        I2cTransaction::write(ADDR, vec![0x6B, 0x80]),
        I2cTransaction::write_read(ADDR, vec![0x6B], vec![0x00]),
        I2cTransaction::write_read(ADDR, vec![0x75], vec![0x68]),
        I2cTransaction::write(ADDR, vec![0x6B, 0x01]),
    ]
}

fn finish(engine: I2cEngine<I2cMock, NoopDelay>) {
    let (mut i2c, _delay) = engine.release();
    i2c.done();
}

#[test]
fn test_initialize_over_i2c() {
    static COMPLETION: Completion = Completion::new();
    let mut expectations = reset_transactions();
    expectations.extend([
        I2cTransaction::write(ADDR, vec![0x1A, 0x00, 0x18, 0x19]),
        I2cTransaction::write(ADDR, vec![0x37, 0xB0, 0x01]),
        I2cTransaction::write_read(ADDR, vec![0x1C], vec![0x19]),
        I2cTransaction::write(ADDR, vec![0x1C, 0x19]),
        I2cTransaction::write_read(ADDR, vec![0x1B], vec![0x18]),
        I2cTransaction::write(ADDR, vec![0x1B, 0x18]),
    ]);
    let i2c = I2cMock::new(&expectations);
    let mut driver = Builder::new().new_i2c(i2c, NoopDelay::new(), &COMPLETION);

    driver.initialize().unwrap();
    finish(driver.release());
}

#[test]
fn test_sample_rate_over_i2c() {
    static COMPLETION: Completion = Completion::new();
    let expectations = [
        I2cTransaction::write_read(ADDR, vec![0x1A], vec![0x01]),
        I2cTransaction::write_read(ADDR, vec![0x19], vec![0xAA]),
        I2cTransaction::write(ADDR, vec![0x19, 4]),
    ];
    let i2c = I2cMock::new(&expectations);
    let mut driver = Builder::new().new_i2c(i2c, NoopDelay::new(), &COMPLETION);

    driver.set_sample_rate(200).unwrap();
    finish(driver.release());
}

#[test]
fn test_reset_polls_until_device_is_back() {
    static COMPLETION: Completion = Completion::new();
    let expectations = [
        I2cTransaction::write(ADDR, vec![0x6B, 0x80]),
        I2cTransaction::write_read(ADDR, vec![0x6B], vec![0x80]),
        I2cTransaction::write_read(ADDR, vec![0x6B], vec![0x80])
            .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
        I2cTransaction::write_read(ADDR, vec![0x6B], vec![0x40]),
        I2cTransaction::write_read(ADDR, vec![0x75], vec![0x68]),
        I2cTransaction::write(ADDR, vec![0x6B, 0x01]),
    ];
    let i2c = I2cMock::new(&expectations);
    let mut engine = I2cEngine::new(i2c, NoopDelay::new());

    engine.submit(ADDR, Request::Reset, COMPLETION.arm().unwrap());
    assert_eq!(COMPLETION.outcome(), TransactionOutcome::Success);
    assert_eq!(COMPLETION.wait(), Ok(()));
    finish(engine);
}

#[test]
fn test_unresponsive_device_fails_reset() {
    static COMPLETION: Completion = Completion::new();
    let mut expectations = vec![I2cTransaction::write(ADDR, vec![0x6B, 0x80])];
    for _ in 0..10 {
        expectations.push(I2cTransaction::write_read(ADDR, vec![0x6B], vec![0x80]));
    }
    let i2c = I2cMock::new(&expectations);
    let mut driver = Builder::new().new_i2c(i2c, NoopDelay::new(), &COMPLETION);

    assert_eq!(
        driver.initialize(),
        Err(TransactionError::BusFailure(status::UNRESPONSIVE))
    );
    finish(driver.release());
}

#[test]
fn test_wrong_chip_fails_reset() {
    static COMPLETION: Completion = Completion::new();
    let expectations = [
        I2cTransaction::write(ADDR, vec![0x6B, 0x80]),
        I2cTransaction::write_read(ADDR, vec![0x6B], vec![0x00]),
        I2cTransaction::write_read(ADDR, vec![0x75], vec![0x71]),
    ];
    let i2c = I2cMock::new(&expectations);
    let mut driver = Builder::new().new_i2c(i2c, NoopDelay::new(), &COMPLETION);

    assert_eq!(
        driver.initialize(),
        Err(TransactionError::BusFailure(status::UNKNOWN_DEVICE))
    );
    finish(driver.release());
}

#[test]
fn test_nack_aborts_initialize() {
    static COMPLETION: Completion = Completion::new();
    let mut expectations = reset_transactions();
    expectations.push(
        I2cTransaction::write(ADDR, vec![0x1A, 0x00, 0x18, 0x19])
            .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)),
    );
    let i2c = I2cMock::new(&expectations);
    let mut driver = Builder::new().new_i2c(i2c, NoopDelay::new(), &COMPLETION);

    assert_eq!(
        driver.initialize(),
        Err(TransactionError::BusFailure(status::DATA_NACK))
    );
    // nothing after the failed burst reached the bus
    finish(driver.release());
}

#[test]
fn test_sample_fetch_over_i2c() {
    static COMPLETION: Completion = Completion::new();
    let mut block = vec![0u8; 22];
    block[0] = 0x01;
    block[1] = 0x00;
    block[14] = 0x01;
    let expectations = [I2cTransaction::write_read(ADDR, vec![0x3B], block)];
    let i2c = I2cMock::new(&expectations);
    let mut driver = Builder::new().new_i2c(i2c, NoopDelay::new(), &COMPLETION);

    let sample = driver.read_sample().unwrap();
    assert_eq!(sample.accel, [256, 0, 0]);
    assert!(sample.mag_ready);
    finish(driver.release());
}

#[test]
fn test_oversized_hand_built_requests_are_refused() {
    static COMPLETION: Completion = Completion::new();
    // nothing may reach the bus
    let expectations: [I2cTransaction; 0] = [];
    let i2c = I2cMock::new(&expectations);
    let mut engine = I2cEngine::new(i2c, NoopDelay::new());

    let read = RegisterOperation {
        register: 0x3B,
        kind: OperationKind::Read { len: 30 },
    };
    engine.submit(ADDR, Request::Register(read), COMPLETION.arm().unwrap());
    assert_eq!(COMPLETION.outcome(), TransactionOutcome::Error(status::ERROR));

    COMPLETION.reset();
    let write = RegisterOperation {
        register: 0x1A,
        kind: OperationKind::Write {
            data: [0; 4],
            len: 9,
        },
    };
    engine.submit(ADDR, Request::Register(write), COMPLETION.arm().unwrap());
    assert_eq!(
        COMPLETION.wait(),
        Err(TransactionError::BusFailure(status::ERROR))
    );
    finish(engine);
}
