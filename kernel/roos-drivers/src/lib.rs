//! Reference drivers for roOs.
//!
//! None of these touch real hardware registers — PIC/IOAPIC programming,
//! PIT/RTC/HPET layouts, and concrete storage controllers are out of scope
//! for the kernel core this workspace specifies. What's here exists so the
//! driver manager, interrupt controller abstraction, time subsystem, and
//! disk manager all have something concrete to attach, bind, register, and
//! scan in integration tests and at boot: a software interrupt controller,
//! a software timer, and a heap-backed block device.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod block;
pub mod interrupt;
pub mod timer;

use roos_driver_api::registration::DriverRecord;

roos_driver_api::driver_entry!(
    MOCK_PIC_DRIVER,
    DriverRecord {
        name: "mock-pic",
        description: "software interrupt controller for boot and tests",
        compatible: "roos,mock-pic",
        version: 1,
        attach: interrupt::attach,
    }
);

roos_driver_api::driver_entry!(
    MOCK_TIMER_DRIVER,
    DriverRecord {
        name: "mock-timer",
        description: "software timer for boot and tests",
        compatible: "roos,mock-timer",
        version: 1,
        attach: timer::attach,
    }
);

roos_driver_api::driver_entry!(
    RAMDISK_DRIVER,
    DriverRecord {
        name: "ramdisk",
        description: "heap-backed block device for boot and tests",
        compatible: "roos,ramdisk",
        version: 1,
        attach: block::attach,
    }
);
