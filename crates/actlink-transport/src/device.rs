use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::LinkStream;

/// Open a serial port in raw 8N1 mode at `baud`.
///
/// USB bridges (FTDI, CH340, CP210x) are reached through the kernel's tty
/// driver the same way.
pub fn open_serial(path: impl AsRef<Path>, baud: u32) -> Result<LinkStream> {
    let path = path.as_ref();
    let open_err = |source| TransportError::Open {
        path: path.to_path_buf(),
        source,
    };

    // O_NONBLOCK so the open does not wait for carrier detect.
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(path)
        .map_err(open_err)?;

    let speed = speed_for(baud)?;
    configure_raw(&file, speed).map_err(open_err)?;
    set_blocking(&file).map_err(open_err)?;

    info!(?path, baud, "opened serial port");
    Ok(LinkStream::from_file(file, "serial"))
}

/// Open a character device (e.g. `/dev/ttyACM0` exposed by a bridge board)
/// without touching its line settings.
pub fn open_char_device(path: impl AsRef<Path>) -> Result<LinkStream> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY)
        .open(path)
        .map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    info!(?path, "opened character device");
    Ok(LinkStream::from_file(file, "char-device"))
}

fn configure_raw(file: &File, speed: libc::speed_t) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: termios is plain old data; tcgetattr fully initializes it below.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: `fd` is an open descriptor owned by `file`; `tio` is writable.
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `tio` is a valid termios obtained from tcgetattr.
    unsafe { libc::cfmakeraw(&mut tio) };
    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    tio.c_cflag &= !(libc::CSTOPB | libc::PARENB);
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        tio.c_cflag &= !libc::CRTSCTS;
    }
    tio.c_cc[libc::VMIN] = 1;
    tio.c_cc[libc::VTIME] = 0;

    // SAFETY: `tio` is valid; the speed value comes from `speed_for`.
    let rc = unsafe { libc::cfsetispeed(&mut tio, speed) | libc::cfsetospeed(&mut tio, speed) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `fd` is open and `tio` is fully initialized.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: `fd` is open; discarding stale bytes has no memory effects.
    if unsafe { libc::tcflush(fd, libc::TCIOFLUSH) } != 0 {
        debug!("tcflush failed: {}", std::io::Error::last_os_error());
    }
    Ok(())
}

fn set_blocking(file: &File) -> std::io::Result<()> {
    let fd = file.as_raw_fd();
    // SAFETY: F_GETFL/F_SETFL on an open descriptor only read and write its flags.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn speed_for(baud: u32) -> Result<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        460800 => libc::B460800,
        500000 => libc::B500000,
        576000 => libc::B576000,
        921600 => libc::B921600,
        1000000 => libc::B1000000,
        1152000 => libc::B1152000,
        1500000 => libc::B1500000,
        2000000 => libc::B2000000,
        2500000 => libc::B2500000,
        3000000 => libc::B3000000,
        3500000 => libc::B3500000,
        4000000 => libc::B4000000,
        other => return Err(TransportError::UnsupportedBaud(other)),
    };
    Ok(speed)
}

// BSD-derived termios takes the numeric rate directly.
#[cfg(not(target_os = "linux"))]
fn speed_for(baud: u32) -> Result<libc::speed_t> {
    libc::speed_t::try_from(baud).map_err(|_| TransportError::UnsupportedBaud(baud))
}
