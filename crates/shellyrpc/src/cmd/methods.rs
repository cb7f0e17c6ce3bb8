use crate::cmd::{with_client, DeviceArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_methods, OutputFormat};

pub fn run(device: &DeviceArgs, format: OutputFormat) -> CliResult<i32> {
    let mut list = with_client(device, |client| async move {
        let result = client
            .list_methods()
            .await
            .map_err(|err| session_error("Shelly.ListMethods failed", err));
        (client, result)
    })?;

    list.methods.sort();
    print_methods(&list, format);
    Ok(SUCCESS)
}
