macro_rules! fail {
    ($err:expr) => (
        return Err(From::from($err))
    );
    ($fmt:expr, $($arg:tt)*) => (
        return Err(From::from(format!($fmt, $($arg)*)))
    );
}

macro_rules! ensure {
    ($expr:expr, $err:expr) => (
        if !($expr) {
            fail!($err);
        }
    );
    ($expr: expr, $fmt:expr, $($arg:tt)*) => (
        if !($expr) {
            fail!(format!($fmt, $($arg)*));
        }
    );
}
