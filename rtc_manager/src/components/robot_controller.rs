//! Robot Controller component.
//!
//! Declares the controller's data ports and configuration variables and
//! registers them with the framework. No callback reads or writes a port:
//! the component is a shell waiting for control logic.
//!
//! | Port | Direction | Type |
//! |------|-----------|------|
//! | `out` | In | `TimedVelocity2D` |
//! | `in` | Out | `TimedShortSeq` |
//! | `x_in` | Out | `TimedLong` |
//! | `y_in` | Out | `TimedLong` |
//! | `vel_in` | Out | `TimedVelocity2D` |

use crate::error::ManagerError;
use crate::manager::Manager;
use rtc_common::component::{Component, ComponentBase, ComponentError, ExecContextId};
use rtc_common::conf::Param;
use rtc_common::data::{TimedLong, TimedShortSeq, TimedVelocity2D};
use rtc_common::port::{InPort, OutPort};
use rtc_common::profile::ModuleProfile;

/// Module spec table.
pub const ROBOT_CONTROLLER_SPEC: &[(&str, &str)] = &[
    ("implementation_id", "RobotControllerTest"),
    ("type_name", "RobotControllerTest"),
    ("description", "Robot Controller component"),
    ("version", "1.0.0"),
    ("vendor", "AIST"),
    ("category", "Controller"),
    ("activity_type", "PERIODIC"),
    ("kind", "DataFlowComponent"),
    ("max_instance", "1"),
    ("language", "Rust"),
    ("lang_type", "compile"),
    // Configuration variables
    ("conf.default.speed_x", "0.0"),
    ("conf.default.speed_r", "0.0"),
    ("conf.default.stop_d", "30"),
    // Widget
    ("conf.__widget__.speed_x", "slider.0.01"),
    ("conf.__widget__.speed_r", "slider.0.01"),
    ("conf.__widget__.stop_d", "text"),
    // Constraints
    ("conf.__constraints__.speed_x", "-1.5<x<1.5"),
    ("conf.__constraints__.speed_r", "-2.0<x<2.0"),
    ("conf.__type__.speed_x", "double"),
    ("conf.__type__.speed_r", "double"),
    ("conf.__type__.stop_d", "int"),
];

/// Robot Controller component.
pub struct RobotController {
    speed_x: Param<f64>,
    speed_r: Param<f64>,
    stop_d: Param<i32>,

    out_in: InPort<TimedVelocity2D>,

    in_out: OutPort<TimedShortSeq>,
    x_in_out: OutPort<TimedLong>,
    y_in_out: OutPort<TimedLong>,
    vel_in_out: OutPort<TimedVelocity2D>,
}

impl RobotController {
    /// Construct the component with unregistered ports and unbound variables.
    pub fn new() -> Self {
        Self {
            speed_x: Param::new(0.0),
            speed_r: Param::new(0.0),
            stop_d: Param::new(0),
            out_in: InPort::new("out"),
            in_out: OutPort::new("in"),
            x_in_out: OutPort::new("x_in"),
            y_in_out: OutPort::new("y_in"),
            vel_in_out: OutPort::new("vel_in"),
        }
    }

    /// Linear speed gain.
    pub fn speed_x(&self) -> f64 {
        self.speed_x.get()
    }

    /// Rotational speed gain.
    pub fn speed_r(&self) -> f64 {
        self.speed_r.get()
    }

    /// Stop distance threshold.
    pub fn stop_d(&self) -> i32 {
        self.stop_d.get()
    }
}

impl Default for RobotController {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for RobotController {
    fn on_initialize(&mut self, base: &mut ComponentBase) -> Result<(), ComponentError> {
        base.add_in_port(&self.out_in)?;

        base.add_out_port(&self.in_out)?;
        base.add_out_port(&self.x_in_out)?;
        base.add_out_port(&self.y_in_out)?;
        base.add_out_port(&self.vel_in_out)?;

        base.bind_parameter("speed_x", &self.speed_x, "0.0")?;
        base.bind_parameter("speed_r", &self.speed_r, "0.0")?;
        base.bind_parameter("stop_d", &self.stop_d, "30")?;

        Ok(())
    }

    fn on_activated(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }

    fn on_deactivated(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }

    fn on_execute(&mut self, _ec_id: ExecContextId) -> Result<(), ComponentError> {
        Ok(())
    }
}

/// Factory function to create a Robot Controller instance.
pub fn create_component() -> Box<dyn Component> {
    Box::new(RobotController::new())
}

/// Module init entry point: registers the Robot Controller factory.
pub fn robot_controller_init(manager: &mut Manager) -> Result<(), ManagerError> {
    let profile = ModuleProfile::from_spec(ROBOT_CONTROLLER_SPEC)?;
    manager.register_factory(profile, create_component)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtc_common::conf::{ParamType, Widget};
    use rtc_common::port::PortDirection;
    use rtc_common::profile::ActivityType;

    fn initialized() -> (RobotController, ComponentBase) {
        let profile = ModuleProfile::from_spec(ROBOT_CONTROLLER_SPEC).unwrap();
        let mut base = ComponentBase::new("RobotControllerTest0", &profile);
        let mut rc = RobotController::new();
        rc.on_initialize(&mut base).unwrap();
        (rc, base)
    }

    #[test]
    fn test_profile() {
        let profile = ModuleProfile::from_spec(ROBOT_CONTROLLER_SPEC).unwrap();
        assert_eq!(profile.implementation_id, "RobotControllerTest");
        assert_eq!(profile.description, "Robot Controller component");
        assert_eq!(profile.vendor, "AIST");
        assert_eq!(profile.category, "Controller");
        assert_eq!(profile.activity_type, ActivityType::Periodic);
        assert_eq!(profile.max_instance, 1);

        let speed_x = profile.param("speed_x").unwrap();
        assert_eq!(speed_x.ty, Some(ParamType::Double));
        assert_eq!(speed_x.widget, Some(Widget::Slider(0.01)));
        let stop_d = profile.param("stop_d").unwrap();
        assert_eq!(stop_d.default, "30");
        assert_eq!(stop_d.ty, Some(ParamType::Int));
        assert_eq!(stop_d.widget, Some(Widget::Text));
        assert!(stop_d.constraint.is_none());
    }

    #[test]
    fn test_constraints_declared() {
        let profile = ModuleProfile::from_spec(ROBOT_CONTROLLER_SPEC).unwrap();
        let speed_x = profile.param("speed_x").unwrap().constraint.clone().unwrap();
        assert!(speed_x.check("1.49"));
        assert!(!speed_x.check("1.5"));
        let speed_r = profile.param("speed_r").unwrap().constraint.clone().unwrap();
        assert!(speed_r.check("-1.99"));
        assert!(!speed_r.check("-2.0"));
    }

    #[test]
    fn test_initialize_registers_ports() {
        let (_, base) = initialized();
        let ports = base.ports().profiles();
        let summary: Vec<_> = ports
            .iter()
            .map(|p| (p.name.as_str(), p.direction, p.data_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("out", PortDirection::In, "IDL:RTC/TimedVelocity2D:1.0"),
                ("in", PortDirection::Out, "IDL:RTC/TimedShortSeq:1.0"),
                ("x_in", PortDirection::Out, "IDL:RTC/TimedLong:1.0"),
                ("y_in", PortDirection::Out, "IDL:RTC/TimedLong:1.0"),
                ("vel_in", PortDirection::Out, "IDL:RTC/TimedVelocity2D:1.0"),
            ]
        );
    }

    #[test]
    fn test_initialize_binds_defaults() {
        let (rc, base) = initialized();
        assert_eq!(rc.speed_x(), 0.0);
        assert_eq!(rc.speed_r(), 0.0);
        assert_eq!(rc.stop_d(), 30);
        assert_eq!(
            base.config().bound_names(),
            vec!["speed_r", "speed_x", "stop_d"]
        );
    }

    #[test]
    fn test_callbacks_succeed_without_touching_ports() {
        let (mut rc, _) = initialized();
        assert!(rc.on_activated(0).is_ok());
        for _ in 0..3 {
            assert!(rc.on_execute(0).is_ok());
        }
        assert!(rc.on_deactivated(0).is_ok());
        assert!(!rc.out_in.is_new());
        assert_eq!(rc.vel_in_out.connection_count(), 0);
    }
}
