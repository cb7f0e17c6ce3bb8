use crate::cmd::{with_client, DeviceArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_device_info, OutputFormat};

pub fn run(device: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    let info = with_client(device, |client| async move {
        let result = client
            .device_info()
            .await
            .map_err(|err| session_error("Shelly.GetDeviceInfo failed", err));
        (client, result)
    })?;

    print_device_info(&info, format);
    Ok(SUCCESS)
}
