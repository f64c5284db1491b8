//! Experimental-frame arrangements of the generator, processor and
//! transducer.
//!
//! ```text
//! efp
//! ├── ef
//! │   ├── generator   out ──► ef.out, transducer.arrived
//! │   └── transducer  out ──► generator.stop
//! └── processor       ef.out ──► in, out ──► ef.in ──► transducer.solved
//! ```

use crate::coupled::{Coupled, ModelError};
use crate::coupling::ComponentRef;
use crate::models::generator::Generator;
use crate::models::processor::Processor;
use crate::models::transducer::{ReportHandle, Transducer};
use crate::types::SimTime;

/// The experimental frame: a generator and a transducer with one input
/// (`in`, solved jobs) and one output (`out`, generated jobs).
pub fn ef(
    name: impl Into<String>,
    period: SimTime,
    observation_time: SimTime,
) -> Result<(Coupled, ReportHandle), ModelError> {
    let mut ef = Coupled::new(name);
    let input = ef.add_in_port("in");
    let output = ef.add_out_port("out");

    let transducer = Transducer::new("transducer", observation_time);
    let report = transducer.report();
    let generator = ef.add_atomic(Generator::new("generator", period))?;
    let transducer = ef.add_atomic(transducer)?;

    ef.add_coupling(ComponentRef::This, input, transducer, Transducer::SOLVED)?;
    ef.add_coupling(generator, Generator::OUT, ComponentRef::This, output)?;
    ef.add_coupling(generator, Generator::OUT, transducer, Transducer::ARRIVED)?;
    ef.add_coupling(transducer, Transducer::OUT, generator, Generator::STOP)?;

    Ok((ef, report))
}

/// An experimental frame closed around a processor.
pub fn efp(
    name: impl Into<String>,
    generator_period: SimTime,
    processing_time: SimTime,
    observation_time: SimTime,
) -> Result<(Coupled, ReportHandle), ModelError> {
    let mut efp = Coupled::new(name);

    let (frame, report) = ef("ef", generator_period, observation_time)?;
    let frame_in = frame.component().port_id_by_name("in");
    let frame_out = frame.component().port_id_by_name("out");
    let frame = efp.add_coupled(frame)?;
    let processor = efp.add_atomic(Processor::new("processor", processing_time))?;

    let (Some(frame_in), Some(frame_out)) = (frame_in, frame_out) else {
        return Err(ModelError::InvalidCoupling {
            parent: efp.name().to_string(),
            reason: "experimental frame is missing its ports".into(),
        });
    };
    efp.add_coupling(frame, frame_out, processor, Processor::IN)?;
    efp.add_coupling(processor, Processor::OUT, frame, frame_in)?;

    Ok((efp, report))
}

/// Generator, processor and transducer side by side. The processor takes
/// three generator periods per job.
pub fn gpt(
    name: impl Into<String>,
    period: SimTime,
    observation_time: SimTime,
) -> Result<(Coupled, ReportHandle), ModelError> {
    let mut gpt = Coupled::new(name);

    let transducer = Transducer::new("transducer", observation_time);
    let report = transducer.report();
    let generator = gpt.add_atomic(Generator::new("generator", period))?;
    let processor = gpt.add_atomic(Processor::new("processor", 3.0 * period))?;
    let transducer = gpt.add_atomic(transducer)?;

    gpt.add_coupling(generator, Generator::OUT, processor, Processor::IN)?;
    gpt.add_coupling(generator, Generator::OUT, transducer, Transducer::ARRIVED)?;
    gpt.add_coupling(processor, Processor::OUT, transducer, Transducer::SOLVED)?;
    gpt.add_coupling(transducer, Transducer::OUT, generator, Generator::STOP)?;

    Ok((gpt, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ef_structure() {
        let (ef, _) = ef("ef", 1.0, 10.0).unwrap();
        let counts = ef.counts();
        assert_eq!(counts.atomics, 2);
        assert_eq!((counts.eic, counts.ic, counts.eoc), (1, 2, 1));
        assert!(ef.port_from_path("ef.transducer.solved").is_some());
    }

    #[test]
    fn test_efp_structure() {
        let (efp, _) = efp("efp", 1.0, 3.0, 10.0).unwrap();
        let counts = efp.counts();
        assert_eq!(counts.atomics, 3);
        assert_eq!(counts.coupleds, 2);
        assert_eq!(counts.ic, 4);
        assert!(efp.component_from_path("efp.ef.generator").is_some());
        assert!(efp.port_from_path("processor.out").is_some());
    }

    #[test]
    fn test_gpt_structure() {
        let (gpt, report) = gpt("gpt", 1.0, 100.0).unwrap();
        assert_eq!(gpt.components().len(), 3);
        assert_eq!(gpt.ic().len(), 4);
        assert!(!report.lock().finished);
    }
}
