mod end_to_end;
mod ipc;
mod pipeline;
mod tcp;
