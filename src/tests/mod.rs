
#[cfg(test)]
mod test_pump_curve;


#[cfg(test)]
mod test_eps;

#[cfg(test)]
mod test_controls;


#[cfg(test)]
mod test_net_text_io;

#[cfg(test)]
mod test_metrics;
