use crate::{MessagePtr, link::PortNum, time::TimerId};

pub(crate) enum Delivery {
    Event(PortNum, MessagePtr),
    Timer(TimerId),
}
