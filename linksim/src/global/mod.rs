mod access;
pub mod anykv;
pub(crate) mod clock;
pub(crate) mod lifecycle;
pub mod statistics;
pub(crate) mod tso;

pub use clock::now;

pub use access::elapsed_run_time;
pub use access::ok_to_end;
pub use access::rank;
pub use access::schedule_timer_after;

pub(crate) use access::close_phase;
pub(crate) use access::may_end;
pub(crate) use access::primaries;
pub(crate) use access::recv_untimed;
pub(crate) use access::schedule;
pub(crate) use access::send;
pub(crate) use access::send_untimed;
pub(crate) use access::set_component;
pub(crate) use access::set_elapsed_run_time;
pub(crate) use access::setup_access;

pub(crate) use clock::fast_forward_clock;

pub(crate) fn drop_all() {
    clock::drop_clock();
    tso::drop_tso();
    anykv::drop_anykv();
    statistics::drop_statistics();
    access::drop_access();
}
