//! System-wide constants and default paths.

/// Default location of the appcell configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "/etc/appcell/appcell.json";

/// Default base runtime specification template.
pub const DEFAULT_BASE_TEMPLATE: &str = "/etc/appcell/base-config.json";

/// Default graphics capability descriptor.
pub const DEFAULT_GRAPHICS_DESCRIPTOR: &str = "/etc/appcell/gpu-config.json";

/// Base directory under which each instance gets `<id>/{rootfs,upper,work}`.
pub const DEFAULT_OVERLAY_ROOT: &str = "/var/run/appcell/containers";

/// Directory holding the per-instance IPC sockets.
pub const DEFAULT_IPC_SOCKET_DIR: &str = "/tmp/appcell/ipc";

/// Hook launcher executable invoked by the container runtime.
pub const DEFAULT_LAUNCHER_PATH: &str = "/usr/bin/appcell-hook";

/// `argv[0]` passed to the hook launcher.
pub const DEFAULT_LAUNCHER_NAME: &str = "appcell-hook";

/// Working directory of the sandboxed process.
pub const DEFAULT_WORKING_DIR: &str = "/tmp";

/// Container path of the persistent application storage.
pub const DEFAULT_STORAGE_PATH: &str = "/home/private";

/// Group granting access to video devices.
pub const DEFAULT_VIDEO_GROUP: &str = "video";

/// GID used for the video group when the lookup fails.
pub const DEFAULT_VIDEO_GID: u32 = 44;

/// Service account that owns artifacts when no identity is supplied.
pub const DEFAULT_SERVICE_USER: &str = "appcell";

/// File name of the generated runtime specification inside a bundle.
pub const SPEC_FILE_NAME: &str = "config.json";

/// Name of the merged mount point inside an instance directory.
pub const ROOTFS_DIR_NAME: &str = "rootfs";

/// Name of the writable overlay layer inside an instance directory.
pub const UPPER_DIR_NAME: &str = "upper";

/// Name of the overlay scratch directory inside an instance directory.
pub const WORK_DIR_NAME: &str = "work";

/// Environment variable naming the display socket.
pub const DISPLAY_SOCKET_ENV: &str = "WAYLAND_DISPLAY";

/// Environment variable naming the directory containing the display socket.
pub const RUNTIME_DIR_ENV: &str = "XDG_RUNTIME_DIR";

/// Environment variable exporting the application storage path.
pub const STORAGE_PATH_ENV: &str = "APPCELL_STORAGE_PATH";

/// Environment variable exporting the IPC socket path.
pub const IPC_SOCKET_ENV: &str = "APPCELL_IPC_SOCKET";

/// The four lifecycle stages that receive a launcher hook, in spec order.
pub const HOOK_STAGES: [&str; 4] = ["createRuntime", "createContainer", "poststart", "poststop"];
